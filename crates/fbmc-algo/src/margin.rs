//! Remaining available margin (RAM) per CBCO and timestep.
//!
//! ## Algorithm
//!
//! For every signed constraint row r of line ℓ:
//! ```text
//! FRM_ℓ          = frm_fraction · maxflow_ℓ
//! F_ref[r]       = nodal_PTDF[r] · injection(t)
//! zonal_PTDF     = nodal_PTDF · GSK
//! F_da[r]        = zonal_PTDF[r] · NP(t)
//! F_nonmarket[r] = F_ref[r] - F_da[r]
//! RAM[r]         = maxflow_ℓ / capacity_multiplier - FRM_ℓ - F_nonmarket[r]
//! ```
//!
//! ## Safety floor
//!
//! A negative RAM would make the whole flow-based domain empty. When any RAM
//! is negative, every RAM below `ram_clamp_threshold` is replaced with
//! `ram_clamp_value`. The override is logged, counted in [`RamClampReport`]
//! and recorded in the returned diagnostics.

use crate::contingency::ContingencyPtdf;
use crate::domain::{DomainRow, DomainTable};
use crate::gsk::{build_gsk, GskMatrix};
use fbmc_core::{
    BaseCaseResult, Diagnostics, FbmcConfig, FbmcError, FbmcResult, GridTopology, GskStrategy,
    LineId,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// Counts of the RAM safety floor for one timestep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RamClampReport {
    pub below_0: usize,
    pub below_10: usize,
    pub below_100: usize,
    pub below_1000: usize,
    /// Rows whose RAM was replaced
    pub clamped: usize,
}

impl RamClampReport {
    pub fn triggered(&self) -> bool {
        self.clamped > 0
    }
}

/// Flow-based domain of one timestep: `zonal_ptdf · NP ≤ ram`.
#[derive(Debug, Clone)]
pub struct TimestepDomain {
    pub timestep: String,
    pub strategy: GskStrategy,
    /// A matrix: zonal_ptdf[row][zone]
    pub zonal_ptdf: Vec<Vec<f64>>,
    /// b vector
    pub ram: Vec<f64>,
    pub table: DomainTable,
    pub clamp: RamClampReport,
    pub diagnostics: Diagnostics,
}

/// Computes per-timestep domains from the assembled contingency PTDF.
#[derive(Debug, Clone, Copy)]
pub struct MarginCalculator<'a> {
    topology: &'a GridTopology,
    basecase: &'a BaseCaseResult,
    ptdf: &'a ContingencyPtdf,
    config: &'a FbmcConfig,
}

impl<'a> MarginCalculator<'a> {
    pub fn new(
        topology: &'a GridTopology,
        basecase: &'a BaseCaseResult,
        ptdf: &'a ContingencyPtdf,
        config: &'a FbmcConfig,
    ) -> FbmcResult<Self> {
        let multiplier = basecase.options.grid.capacity_multiplier;
        if !(multiplier > 0.0) {
            return Err(FbmcError::Config(format!(
                "capacity_multiplier must be positive, got {}",
                multiplier
            )));
        }
        if ptdf.num_nodes() != topology.num_nodes() {
            return Err(FbmcError::dimension(
                "contingency PTDF columns",
                topology.num_nodes(),
                ptdf.num_nodes(),
            ));
        }
        Ok(Self {
            topology,
            basecase,
            ptdf,
            config,
        })
    }

    /// Build the GSK of `strategy` from the base-case plants and options.
    pub fn gsk(&self, strategy: GskStrategy) -> GskMatrix {
        build_gsk(
            self.topology,
            &self.basecase.plants,
            &self.basecase.options.optimization.plant_types,
            strategy,
        )
    }

    /// Domain of `timestep` under `strategy`.
    pub fn timestep_domain(
        &self,
        strategy: GskStrategy,
        timestep: &str,
    ) -> FbmcResult<TimestepDomain> {
        let gsk = self.gsk(strategy);
        self.timestep_domain_with_gsk(&gsk, timestep)
    }

    /// Domain of `timestep` reusing an already built GSK.
    pub fn timestep_domain_with_gsk(
        &self,
        gsk: &GskMatrix,
        timestep: &str,
    ) -> FbmcResult<TimestepDomain> {
        info!(timestep, strategy = %gsk.strategy, "creating zonal Ab");

        let injection = self.basecase.injection(timestep, self.topology)?;
        let net_position = self.basecase.net_position(timestep, self.topology);

        let f_ref = mat_vec(&self.ptdf.rows, &injection);
        let zonal_ptdf = gsk.zonal_ptdf(&self.ptdf.rows)?;
        let f_da = mat_vec(&zonal_ptdf, &net_position);

        let frm = self.frm_per_line()?;
        let multiplier = self.basecase.options.grid.capacity_multiplier;

        let mut ram = Vec::with_capacity(self.ptdf.num_rows());
        for (r, label) in self.ptdf.labels.iter().enumerate() {
            let maxflow = self.maxflow(&label.line)?;
            let f_nonmarket = f_ref[r] - f_da[r];
            ram.push(maxflow / multiplier - frm[&label.line] - f_nonmarket);
        }

        let mut diagnostics = Diagnostics::new();
        let clamp = self.apply_safety_floor(&mut ram);
        if clamp.triggered() {
            diagnostics.add_warning_with_entity(
                "ram_clamp",
                &format!(
                    "{} RAM values replaced with {} (below 0: {}, 10: {}, 100: {}, 1000: {})",
                    clamp.clamped,
                    self.config.ram_clamp_value,
                    clamp.below_0,
                    clamp.below_10,
                    clamp.below_100,
                    clamp.below_1000
                ),
                &format!("Timestep {}", timestep),
            );
        }

        let rows = self
            .ptdf
            .labels
            .iter()
            .zip(zonal_ptdf.iter())
            .zip(ram.iter())
            .map(|((label, sensitivities), &ram)| DomainRow {
                line: label.line.clone(),
                outage: label.outage.clone(),
                sign: label.sign,
                sensitivities: sensitivities.clone(),
                ram,
                timestep: timestep.to_string(),
                gsk_strategy: gsk.strategy,
            })
            .collect();

        Ok(TimestepDomain {
            timestep: timestep.to_string(),
            strategy: gsk.strategy,
            zonal_ptdf,
            ram,
            table: DomainTable {
                zones: gsk.zones.clone(),
                rows,
            },
            clamp,
            diagnostics,
        })
    }

    /// FRM/FAV of every distinct monitored line.
    fn frm_per_line(&self) -> FbmcResult<HashMap<LineId, f64>> {
        let mut frm = HashMap::new();
        for line in self.ptdf.lines() {
            let maxflow = self.maxflow(line)?;
            frm.insert(line.clone(), maxflow * self.config.frm_fraction);
        }
        Ok(frm)
    }

    fn maxflow(&self, line: &LineId) -> FbmcResult<f64> {
        self.topology
            .line(line)
            .map(|l| l.maxflow)
            .ok_or_else(|| FbmcError::UnknownLine(line.to_string()))
    }

    fn apply_safety_floor(&self, ram: &mut [f64]) -> RamClampReport {
        if !ram.iter().any(|&v| v < 0.0) {
            return RamClampReport::default();
        }
        let count_below = |limit: f64| ram.iter().filter(|&&v| v < limit).count();
        let mut report = RamClampReport {
            below_0: count_below(0.0),
            below_10: count_below(10.0),
            below_100: count_below(100.0),
            below_1000: count_below(1000.0),
            clamped: 0,
        };
        warn!(
            "Number of RAMs below: [0 - {}, 10 - {}, 100 - {}, 1000 - {}]",
            report.below_0, report.below_10, report.below_100, report.below_1000
        );
        for value in ram.iter_mut() {
            if *value < self.config.ram_clamp_threshold {
                *value = self.config.ram_clamp_value;
                report.clamped += 1;
            }
        }
        report
    }
}

fn mat_vec(matrix: &[Vec<f64>], vector: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(vector).map(|(a, b)| a * b).sum())
        .collect()
}
