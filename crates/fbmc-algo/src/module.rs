//! Timestep orchestration of the flow-based parameter computation.
//!
//! [`FbmcModule`] ties the components together:
//!
//! 1. select the base case and validate inputs (fails before any numerics);
//! 2. assemble the contingency PTDF once, from a supplied CBCO list or from
//!    critical branch selection;
//! 3. for every timestep of the base case, compute the zonal domain, hand it
//!    to a [`ConstraintReducer`] and keep the reduced rows;
//! 4. concatenate all timesteps into [`FbmcParameters`].
//!
//! Per-timestep domains are independent records; nothing is shared mutably
//! across timesteps. With the `parallel` feature they are computed on the
//! rayon thread pool before the (sequential) reduction pass.

use crate::contingency::{assemble_contingency_ptdf, CbcoPlan, CbcoSource, ContingencyPtdf};
use crate::critical_branches::{select_critical_branches, CriticalBranches};
use crate::domain::{DomainRow, DomainTable};
use crate::gsk::{build_gsk, GskMatrix};
use crate::margin::{MarginCalculator, TimestepDomain};
use crate::projection::{project_domain, ProjectedDomain};
use crate::reduction::{ConstraintReducer, ReductionProblem};
use fbmc_core::{
    BaseCaseResult, Diagnostics, FbmcConfig, FbmcError, FbmcResult, GridModel, GskStrategy,
    ResultStore, ZoneId,
};
use serde::Serialize;
use tracing::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Reduced flow-based constraints of all timesteps.
///
/// Rows are keyed by `"{line}_{outage}"`. Every timestep reuses the same
/// CBCO universe, so keys repeat across timesteps; use the row's `timestep`
/// (or [`FbmcParameters::unique_keys`]) to tell them apart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FbmcParameters {
    pub zones: Vec<ZoneId>,
    pub rows: Vec<DomainRow>,
    /// Reduced row count per timestep, in processing order
    pub timesteps: Vec<(String, usize)>,
    pub diagnostics: Diagnostics,
}

impl FbmcParameters {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row index: `"{line}_{outage}"`, repeating across timesteps.
    pub fn index(&self) -> Vec<String> {
        self.rows.iter().map(DomainRow::key).collect()
    }

    /// `"{timestep}_{line}_{outage}"`, unique for distinct rows.
    pub fn unique_keys(&self) -> Vec<String> {
        self.rows.iter().map(DomainRow::unique_key).collect()
    }

    pub fn rows_for_timestep<'a>(
        &'a self,
        timestep: &'a str,
    ) -> impl Iterator<Item = &'a DomainRow> + 'a {
        self.rows.iter().filter(move |r| r.timestep == timestep)
    }

    /// Number of timesteps where the RAM safety floor kicked in.
    pub fn ram_clamp_warnings(&self) -> usize {
        self.diagnostics.issues_by_category("ram_clamp").count()
    }

    pub fn to_json(&self) -> FbmcResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Flow-based market coupling domain for one base case.
pub struct FbmcModule<'a, G: GridModel + ?Sized> {
    grid: &'a G,
    basecase: &'a BaseCaseResult,
    config: FbmcConfig,
    region: Vec<ZoneId>,
    critical_branches: Option<CriticalBranches>,
    nodal_fbmc_ptdf: ContingencyPtdf,
}

impl<'a, G: GridModel + ?Sized> FbmcModule<'a, G> {
    /// Select the base case, validate inputs and assemble the contingency PTDF.
    pub fn new(
        grid: &'a G,
        results: &'a ResultStore,
        basecase_name: Option<&str>,
        cbco_source: CbcoSource,
        config: FbmcConfig,
    ) -> FbmcResult<Self> {
        info!("Initializing the FBMC module");
        let basecase = results.select_basecase(basecase_name)?;
        config.validate()?;

        let topology = grid.topology();
        topology.validate()?;
        if grid.ptdf().num_lines() != topology.num_lines() {
            return Err(FbmcError::dimension(
                "grid PTDF rows",
                topology.num_lines(),
                grid.ptdf().num_lines(),
            ));
        }
        if grid.ptdf().num_nodes() != topology.num_nodes() {
            return Err(FbmcError::dimension(
                "grid PTDF columns",
                topology.num_nodes(),
                grid.ptdf().num_nodes(),
            ));
        }

        let region: Vec<ZoneId> = config
            .flowbased_region
            .iter()
            .map(|z| ZoneId::new(z.as_str()))
            .collect();

        let (plan, critical_branches) = match &cbco_source {
            CbcoSource::List(records) => (CbcoPlan::from_records(topology, records)?, None),
            CbcoSource::Computed => {
                let gsk = build_gsk(
                    topology,
                    &basecase.plants,
                    &basecase.options.optimization.plant_types,
                    config.gsk_strategy,
                );
                let cbs = select_critical_branches(grid, &gsk, &region, config.cb_threshold)?;
                let plan = CbcoPlan::from_critical_branches(grid, &cbs, config.lodf_sensitivity)?;
                (plan, Some(cbs))
            }
        };

        let nodal_fbmc_ptdf = assemble_contingency_ptdf(grid, &plan)?;

        let module = Self {
            grid,
            basecase,
            config,
            region,
            critical_branches,
            nodal_fbmc_ptdf,
        };
        // Fail on a bad capacity multiplier before any timestep is processed
        module.margin_calculator()?;
        info!(base_case = %basecase.name, "FBMC module initialized");
        Ok(module)
    }

    pub fn basecase(&self) -> &BaseCaseResult {
        self.basecase
    }

    pub fn config(&self) -> &FbmcConfig {
        &self.config
    }

    /// Contingency PTDF assembled at construction.
    pub fn nodal_fbmc_ptdf(&self) -> &ContingencyPtdf {
        &self.nodal_fbmc_ptdf
    }

    /// Critical branches, when the CBCO set was computed.
    pub fn critical_branches(&self) -> Option<&CriticalBranches> {
        self.critical_branches.as_ref()
    }

    pub fn create_gsk(&self, strategy: GskStrategy) -> GskMatrix {
        build_gsk(
            self.grid.topology(),
            &self.basecase.plants,
            &self.basecase.options.optimization.plant_types,
            strategy,
        )
    }

    /// Critical branches for an arbitrary threshold and strategy.
    pub fn return_critical_branches(
        &self,
        threshold: f64,
        strategy: GskStrategy,
    ) -> FbmcResult<CriticalBranches> {
        let gsk = self.create_gsk(strategy);
        select_critical_branches(self.grid, &gsk, &self.region, threshold)
    }

    fn margin_calculator(&self) -> FbmcResult<MarginCalculator<'_>> {
        MarginCalculator::new(
            self.grid.topology(),
            self.basecase,
            &self.nodal_fbmc_ptdf,
            &self.config,
        )
    }

    /// Zonal PTDF and RAM of one timestep.
    pub fn create_flowbased_ptdf(
        &self,
        strategy: GskStrategy,
        timestep: &str,
    ) -> FbmcResult<TimestepDomain> {
        self.margin_calculator()?.timestep_domain(strategy, timestep)
    }

    /// Project a timestep domain onto two bilateral exchanges for plotting.
    pub fn create_fbmc_equations(
        &self,
        domain_x: &[ZoneId],
        domain_y: &[ZoneId],
        domain: &TimestepDomain,
    ) -> FbmcResult<ProjectedDomain> {
        project_domain(
            &domain.table.zones,
            domain_x,
            domain_y,
            &domain.zonal_ptdf,
            &domain.ram,
            self.config.rhs_floor,
        )
    }

    /// Domains of every base-case timestep under the configured strategy.
    pub fn timestep_domains(&self) -> FbmcResult<Vec<TimestepDomain>> {
        let calculator = self.margin_calculator()?;
        let gsk = calculator.gsk(self.config.gsk_strategy);
        let timesteps = self.basecase.timesteps();

        #[cfg(feature = "parallel")]
        let domains = timesteps
            .par_iter()
            .map(|t| calculator.timestep_domain_with_gsk(&gsk, t))
            .collect::<FbmcResult<Vec<_>>>()?;

        #[cfg(not(feature = "parallel"))]
        let domains = timesteps
            .iter()
            .map(|t| calculator.timestep_domain_with_gsk(&gsk, t))
            .collect::<FbmcResult<Vec<_>>>()?;

        Ok(domains)
    }

    /// Reduced flow-based parameters of all timesteps.
    pub fn create_flowbased_parameters<R: ConstraintReducer + ?Sized>(
        &self,
        reducer: &mut R,
    ) -> FbmcResult<FbmcParameters> {
        let domains = self.timestep_domains()?;
        let zones = self.grid.topology().zones.clone();
        let mut combined = DomainTable::new(zones.clone());
        let mut timesteps = Vec::with_capacity(domains.len());
        let mut diagnostics = Diagnostics::new();

        for domain in domains {
            let problem = ReductionProblem::from_domain(&domain);
            let selected = reducer.reduce(&problem)?;
            let reduced = reducer.return_cbco(&problem, &selected)?;
            info!(
                timestep = %domain.timestep,
                constraints = problem.num_constraints(),
                reduced = reduced.len(),
                "reduced flow-based domain"
            );
            timesteps.push((domain.timestep.clone(), reduced.len()));
            combined.extend(reduced)?;
            diagnostics.merge(domain.diagnostics);
        }

        if diagnostics.has_issues() {
            warn!(summary = %diagnostics.summary(), "flow-based parameters have diagnostics");
        }

        Ok(FbmcParameters {
            zones,
            rows: combined.rows,
            timesteps,
            diagnostics,
        })
    }
}
