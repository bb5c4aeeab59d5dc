//! Contract of the constraint-reduction collaborator.
//!
//! The flow-based domain of a timestep usually contains many redundant
//! constraints. Removing them (e.g. with Clarkson's algorithm) is the job of
//! a [`ConstraintReducer`]; this crate only prepares the system and consumes
//! the selected rows.

use crate::domain::DomainTable;
use crate::margin::TimestepDomain;
use fbmc_core::FbmcResult;

/// Working constraint system handed to a reducer: `a · x ≤ b`.
#[derive(Debug, Clone)]
pub struct ReductionProblem<'a> {
    pub a: &'a [Vec<f64>],
    pub b: &'a [f64],
    /// Row labels of `a`/`b`
    pub cbco_info: &'a DomainTable,
    /// Box bounds on `x`; empty for unbounded
    pub x_bounds: Vec<f64>,
    /// Rows already known to be non-redundant; empty to start from scratch
    pub cbco_index: Vec<usize>,
}

impl<'a> ReductionProblem<'a> {
    pub fn from_domain(domain: &'a TimestepDomain) -> Self {
        Self {
            a: &domain.zonal_ptdf,
            b: &domain.ram,
            cbco_info: &domain.table,
            x_bounds: Vec::new(),
            cbco_index: Vec::new(),
        }
    }

    pub fn num_constraints(&self) -> usize {
        self.b.len()
    }
}

/// Removes redundant rows from a zonal constraint system.
pub trait ConstraintReducer {
    /// Indices of the non-redundant rows of `problem`.
    fn reduce(&mut self, problem: &ReductionProblem<'_>) -> FbmcResult<Vec<usize>>;

    /// Reduced constraint table for the selected rows.
    fn return_cbco(
        &self,
        problem: &ReductionProblem<'_>,
        selected: &[usize],
    ) -> FbmcResult<DomainTable> {
        problem.cbco_info.select(selected)
    }
}

/// Reducer that keeps every constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAllReducer;

impl ConstraintReducer for KeepAllReducer {
    fn reduce(&mut self, problem: &ReductionProblem<'_>) -> FbmcResult<Vec<usize>> {
        Ok((0..problem.num_constraints()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contingency::Sign;
    use crate::domain::DomainRow;
    use crate::margin::RamClampReport;
    use fbmc_core::{Diagnostics, FbmcError, GskStrategy, LineId, Outage, ZoneId};

    fn domain() -> TimestepDomain {
        let row = |sign: Sign, s: f64| DomainRow {
            line: LineId::new("l1"),
            outage: Outage::Basecase,
            sign,
            sensitivities: vec![s],
            ram: 50.0,
            timestep: "t1".into(),
            gsk_strategy: GskStrategy::Flat,
        };
        TimestepDomain {
            timestep: "t1".into(),
            strategy: GskStrategy::Flat,
            zonal_ptdf: vec![vec![0.5], vec![-0.5]],
            ram: vec![50.0, 50.0],
            table: DomainTable {
                zones: vec![ZoneId::new("A")],
                rows: vec![row(Sign::Positive, 0.5), row(Sign::Negative, -0.5)],
            },
            clamp: RamClampReport::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    #[test]
    fn test_keep_all() {
        let domain = domain();
        let problem = ReductionProblem::from_domain(&domain);
        let mut reducer = KeepAllReducer;
        let selected = reducer.reduce(&problem).unwrap();
        assert_eq!(selected, vec![0, 1]);
        assert_eq!(reducer.return_cbco(&problem, &selected).unwrap().len(), 2);
    }

    #[test]
    fn test_return_cbco_rejects_out_of_range() {
        let domain = domain();
        let problem = ReductionProblem::from_domain(&domain);
        let err = KeepAllReducer.return_cbco(&problem, &[5]).unwrap_err();
        assert!(matches!(err, FbmcError::Reduction(_)));
    }
}
