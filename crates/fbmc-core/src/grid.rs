//! Grid model contract and an in-memory implementation.
//!
//! ## Power Transfer Distribution Factors (PTDF)
//!
//! PTDF[ℓ,n] = sensitivity of flow on line ℓ to injection at node n:
//! ```text
//! ΔF_ℓ = PTDF[ℓ,n] × ΔP_n
//! ```
//!
//! ## Line Outage Distribution Factors (LODF)
//!
//! LODF[ℓ,o] = fraction of line o's flow that shifts to line ℓ when o trips.
//! The post-outage sensitivity row of ℓ follows directly:
//! ```text
//! PTDF_o[ℓ,·] = PTDF[ℓ,·] + LODF[ℓ,o] × PTDF[o,·]
//! ```
//!
//! The flow-based domain only *consumes* these factors; computing them from
//! network impedances is the job of whatever implements [`GridModel`].

use crate::error::{FbmcError, FbmcResult};
use crate::{GridTopology, LineId};
use tracing::debug;

/// Nodal PTDF matrix: rows follow topology line order, columns node order.
#[derive(Debug, Clone)]
pub struct PtdfMatrix {
    /// PTDF values: values[line_idx][node_idx]
    pub values: Vec<Vec<f64>>,
    num_nodes: usize,
}

impl PtdfMatrix {
    /// Wrap a row-major matrix, checking that every row has `num_nodes` entries.
    pub fn new(values: Vec<Vec<f64>>, num_nodes: usize) -> FbmcResult<Self> {
        if let Some(row) = values.iter().find(|row| row.len() != num_nodes) {
            return Err(FbmcError::dimension("PTDF row length", num_nodes, row.len()));
        }
        Ok(Self { values, num_nodes })
    }

    pub fn row(&self, line_idx: usize) -> Option<&[f64]> {
        self.values.get(line_idx).map(|r| r.as_slice())
    }

    /// Number of lines (rows).
    pub fn num_lines(&self) -> usize {
        self.values.len()
    }

    /// Number of nodes (columns).
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }
}

/// Square LODF matrix indexed by topology line order.
#[derive(Debug, Clone)]
pub struct LodfMatrix {
    /// LODF values: values[ℓ_idx][o_idx]
    pub values: Vec<Vec<f64>>,
}

impl LodfMatrix {
    pub fn new(values: Vec<Vec<f64>>) -> FbmcResult<Self> {
        let n = values.len();
        if let Some(row) = values.iter().find(|row| row.len() != n) {
            return Err(FbmcError::dimension("LODF row length", n, row.len()));
        }
        Ok(Self { values })
    }

    pub fn get(&self, line_idx: usize, outage_idx: usize) -> Option<f64> {
        self.values.get(line_idx)?.get(outage_idx).copied()
    }

    pub fn num_lines(&self) -> usize {
        self.values.len()
    }
}

/// Network sensitivities consumed by the flow-based domain computation.
pub trait GridModel {
    /// Node, line and zone tables the matrices are indexed by.
    fn topology(&self) -> &GridTopology;

    /// Base-case (N-0) nodal PTDF.
    fn ptdf(&self) -> &PtdfMatrix;

    /// Outages whose influence on `line` exceeds `sensitivity`, in line order.
    fn lodf_filter(&self, line: &LineId, sensitivity: f64) -> FbmcResult<Vec<LineId>>;

    /// Nodal PTDF row of `line` with `outage` out of service.
    fn n_1_ptdf(&self, line: &LineId, outage: &LineId) -> FbmcResult<Vec<f64>>;
}

/// Grid model backed by precomputed PTDF and LODF tables.
#[derive(Debug, Clone)]
pub struct StaticGridModel {
    topology: GridTopology,
    ptdf: PtdfMatrix,
    lodf: LodfMatrix,
}

impl StaticGridModel {
    pub fn new(topology: GridTopology, ptdf: PtdfMatrix, lodf: LodfMatrix) -> FbmcResult<Self> {
        if ptdf.num_lines() != topology.num_lines() {
            return Err(FbmcError::dimension(
                "PTDF rows",
                topology.num_lines(),
                ptdf.num_lines(),
            ));
        }
        if ptdf.num_nodes() != topology.num_nodes() {
            return Err(FbmcError::dimension(
                "PTDF columns",
                topology.num_nodes(),
                ptdf.num_nodes(),
            ));
        }
        if lodf.num_lines() != topology.num_lines() {
            return Err(FbmcError::dimension(
                "LODF size",
                topology.num_lines(),
                lodf.num_lines(),
            ));
        }
        Ok(Self {
            topology,
            ptdf,
            lodf,
        })
    }

    fn line_idx(&self, line: &LineId) -> FbmcResult<usize> {
        self.topology
            .line_index(line)
            .ok_or_else(|| FbmcError::UnknownLine(line.to_string()))
    }

    fn lodf_factor(&self, line_idx: usize, outage_idx: usize) -> FbmcResult<f64> {
        self.lodf
            .get(line_idx, outage_idx)
            .ok_or_else(|| FbmcError::dimension("LODF size", self.lodf.num_lines(), outage_idx))
    }
}

impl GridModel for StaticGridModel {
    fn topology(&self) -> &GridTopology {
        &self.topology
    }

    fn ptdf(&self) -> &PtdfMatrix {
        &self.ptdf
    }

    fn lodf_filter(&self, line: &LineId, sensitivity: f64) -> FbmcResult<Vec<LineId>> {
        let l = self.line_idx(line)?;
        let mut outages = Vec::new();
        for (o, outage) in self.topology.lines.iter().enumerate() {
            if o == l {
                continue;
            }
            let factor = self.lodf_factor(l, o)?;
            if !factor.is_finite() {
                // Islanding outage: no post-outage row exists
                debug!(line = %line, outage = %outage.id, "skipping islanding outage");
                continue;
            }
            if factor.abs() > sensitivity {
                outages.push(outage.id.clone());
            }
        }
        Ok(outages)
    }

    fn n_1_ptdf(&self, line: &LineId, outage: &LineId) -> FbmcResult<Vec<f64>> {
        let l = self.line_idx(line)?;
        let o = self.line_idx(outage)?;
        let factor = self.lodf_factor(l, o)?;
        if !factor.is_finite() {
            return Err(FbmcError::Grid(format!(
                "outage of '{}' islands the network, no N-1 PTDF for '{}'",
                outage, line
            )));
        }
        let base = &self.ptdf.values[l];
        let shifted = &self.ptdf.values[o];
        Ok(base
            .iter()
            .zip(shifted)
            .map(|(b, s)| b + factor * s)
            .collect())
    }
}
