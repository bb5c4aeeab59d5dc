//! Domain-info tables: one row per signed CBCO constraint.
//!
//! ```text
//! Σ_z sensitivities[z] · NP[z] ≤ ram
//! ```
//!
//! Rows carry the zonal sensitivities in the table's zone order, the RAM of
//! the constraint and the timestep / GSK strategy they were computed for.

use crate::contingency::Sign;
use fbmc_core::{FbmcError, FbmcResult, GskStrategy, LineId, Outage, ZoneId};
use serde::{Deserialize, Serialize};

/// One signed constraint of a flow-based domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRow {
    pub line: LineId,
    pub outage: Outage,
    pub sign: Sign,
    /// Zonal PTDF, one entry per zone of the owning table
    pub sensitivities: Vec<f64>,
    pub ram: f64,
    pub timestep: String,
    pub gsk_strategy: GskStrategy,
}

impl DomainRow {
    /// Composite `"{line}_{outage}"` key.
    pub fn key(&self) -> String {
        format!("{}_{}", self.line, self.outage)
    }

    /// Composite key prefixed with the timestep.
    pub fn unique_key(&self) -> String {
        format!("{}_{}_{}", self.timestep, self.line, self.outage)
    }
}

/// Ordered collection of [`DomainRow`]s sharing one zone order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainTable {
    pub zones: Vec<ZoneId>,
    pub rows: Vec<DomainRow>,
}

impl DomainTable {
    pub fn new(zones: Vec<ZoneId>) -> Self {
        Self {
            zones,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// New table holding the rows at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> FbmcResult<DomainTable> {
        let mut rows = Vec::with_capacity(indices.len());
        for &idx in indices {
            let row = self.rows.get(idx).ok_or_else(|| {
                FbmcError::Reduction(format!(
                    "selected row {} out of range for {} constraints",
                    idx,
                    self.rows.len()
                ))
            })?;
            rows.push(row.clone());
        }
        Ok(DomainTable {
            zones: self.zones.clone(),
            rows,
        })
    }

    /// Append the rows of `other`; both tables must share the zone order.
    pub fn extend(&mut self, other: DomainTable) -> FbmcResult<()> {
        if self.zones != other.zones {
            return Err(FbmcError::Validation(
                "cannot concatenate domain tables with different zone order".into(),
            ));
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}
