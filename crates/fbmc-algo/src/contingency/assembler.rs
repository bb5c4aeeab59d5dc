//! Build the signed nodal PTDF of all CBCOs.
//!
//! Assembly runs in two steps:
//!
//! 1. **Plan:** decide which lines get N-0 rows and which outages each line
//!    is monitored under ([`CbcoPlan`]), either from a supplied CBCO list or
//!    from a critical branch selection plus the grid's LODF filter.
//! 2. **Assemble:** fetch every row from the grid model and write it, with
//!    its negated twin, into a buffer sized up front from the plan.

use crate::critical_branches::CriticalBranches;
use fbmc_core::{FbmcError, FbmcResult, GridModel, GridTopology, LineId, Outage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// One (critical branch, critical outage) pair of a supplied CBCO list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CbcoRecord {
    pub cb: LineId,
    pub co: Outage,
}

impl CbcoRecord {
    pub fn new(cb: impl Into<String>, co: impl Into<String>) -> Self {
        let co: String = co.into();
        Self {
            cb: LineId::new(cb),
            co: Outage::from(co),
        }
    }
}

/// Where the CBCO set comes from.
#[derive(Debug, Clone, Default)]
pub enum CbcoSource {
    /// Critical branch selection plus LODF filtering
    #[default]
    Computed,
    /// Externally supplied CBCO list, used verbatim
    List(Vec<CbcoRecord>),
}

/// Direction of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    pub fn factor(&self) -> f64 {
        match self {
            Sign::Positive => 1.0,
            Sign::Negative => -1.0,
        }
    }
}

/// Label of one assembled row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CbcoLabel {
    pub line: LineId,
    pub outage: Outage,
    pub sign: Sign,
}

/// Lines and outages to assemble rows for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CbcoPlan {
    /// Lines monitored without outage (N-0)
    pub basecase: Vec<LineId>,
    /// Lines monitored under outages (N-1), in assembly order
    pub outages: Vec<(LineId, Vec<LineId>)>,
}

impl CbcoPlan {
    /// Number of distinct (line, outage) constraints before sign duplication.
    pub fn num_constraints(&self) -> usize {
        self.basecase.len() + self.outages.iter().map(|(_, o)| o.len()).sum::<usize>()
    }

    /// Plan from a supplied CBCO list.
    ///
    /// `basecase` records become N-0 rows in list order; the remaining records
    /// are grouped by line in order of first appearance.
    pub fn from_records(topology: &GridTopology, records: &[CbcoRecord]) -> FbmcResult<Self> {
        let mut plan = CbcoPlan::default();
        let mut position: HashMap<&LineId, usize> = HashMap::new();

        for record in records {
            if topology.line_index(&record.cb).is_none() {
                return Err(FbmcError::UnknownLine(record.cb.to_string()));
            }
            match &record.co {
                Outage::Basecase => plan.basecase.push(record.cb.clone()),
                Outage::Line(outage) => {
                    if topology.line_index(outage).is_none() {
                        return Err(FbmcError::UnknownLine(outage.to_string()));
                    }
                    let idx = *position.entry(&record.cb).or_insert_with(|| {
                        plan.outages.push((record.cb.clone(), Vec::new()));
                        plan.outages.len() - 1
                    });
                    plan.outages[idx].1.push(outage.clone());
                }
            }
        }
        Ok(plan)
    }

    /// Plan from a critical branch selection.
    ///
    /// Only contingency-eligible critical lines are monitored; each of them
    /// under the outages the grid model's LODF filter reports as relevant.
    pub fn from_critical_branches<G: GridModel + ?Sized>(
        grid: &G,
        critical: &CriticalBranches,
        lodf_sensitivity: f64,
    ) -> FbmcResult<Self> {
        let topology = grid.topology();
        let mut plan = CbcoPlan::default();
        for line in &topology.lines {
            if !line.contingency || !critical.contains(&line.id) {
                continue;
            }
            let outages = grid.lodf_filter(&line.id, lodf_sensitivity)?;
            debug!(line = %line.id, outages = outages.len(), "relevant outages");
            plan.basecase.push(line.id.clone());
            plan.outages.push((line.id.clone(), outages));
        }
        Ok(plan)
    }
}

/// Signed nodal PTDF of all CBCOs with one label per row.
#[derive(Debug, Clone)]
pub struct ContingencyPtdf {
    /// PTDF values: rows[row_idx][node_idx]
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<CbcoLabel>,
    pairs: Vec<usize>,
    num_nodes: usize,
}

impl ContingencyPtdf {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Index of the row holding the negated twin of `row`.
    pub fn pair_of(&self, row: usize) -> Option<usize> {
        self.pairs.get(row).copied()
    }

    /// Distinct monitored lines in order of first appearance.
    pub fn lines(&self) -> Vec<&LineId> {
        let mut seen = std::collections::HashSet::new();
        self.labels
            .iter()
            .filter(|l| seen.insert(&l.line))
            .map(|l| &l.line)
            .collect()
    }
}

/// Fetch and sign-duplicate the rows of `plan`.
pub fn assemble_contingency_ptdf<G: GridModel + ?Sized>(
    grid: &G,
    plan: &CbcoPlan,
) -> FbmcResult<ContingencyPtdf> {
    let topology = grid.topology();
    let base = grid.ptdf();
    let num_nodes = topology.num_nodes();
    let total_rows = 2 * plan.num_constraints();

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(total_rows);
    let mut labels: Vec<CbcoLabel> = Vec::with_capacity(total_rows);
    let mut pairs: Vec<usize> = Vec::with_capacity(total_rows);

    let mut block: Vec<(LineId, Outage, Vec<f64>)> = Vec::with_capacity(plan.basecase.len());
    for line in &plan.basecase {
        let idx = topology
            .line_index(line)
            .ok_or_else(|| FbmcError::UnknownLine(line.to_string()))?;
        let row = base
            .row(idx)
            .ok_or_else(|| FbmcError::dimension("base PTDF rows", topology.num_lines(), idx))?;
        block.push((line.clone(), Outage::Basecase, row.to_vec()));
    }
    push_signed_block(&mut rows, &mut labels, &mut pairs, block, num_nodes)?;

    for (line, outages) in &plan.outages {
        let mut block = Vec::with_capacity(outages.len());
        for outage in outages {
            let row = grid.n_1_ptdf(line, outage)?;
            block.push((line.clone(), Outage::Line(outage.clone()), row));
        }
        push_signed_block(&mut rows, &mut labels, &mut pairs, block, num_nodes)?;
    }

    debug_assert_eq!(rows.len(), total_rows);
    info!(
        rows = rows.len(),
        n0 = plan.basecase.len(),
        n1 = plan.num_constraints() - plan.basecase.len(),
        "assembled contingency PTDF"
    );

    Ok(ContingencyPtdf {
        rows,
        labels,
        pairs,
        num_nodes,
    })
}

/// Append a block as `[+rows; -rows]`, recording the twin of every row.
fn push_signed_block(
    rows: &mut Vec<Vec<f64>>,
    labels: &mut Vec<CbcoLabel>,
    pairs: &mut Vec<usize>,
    block: Vec<(LineId, Outage, Vec<f64>)>,
    num_nodes: usize,
) -> FbmcResult<()> {
    let offset = rows.len();
    let n = block.len();

    for (_, _, row) in &block {
        if row.len() != num_nodes {
            return Err(FbmcError::dimension("PTDF row length", num_nodes, row.len()));
        }
    }

    for (sign, twin_offset) in [(Sign::Positive, offset + n), (Sign::Negative, offset)] {
        let factor = sign.factor();
        for (i, (line, outage, row)) in block.iter().enumerate() {
            rows.push(row.iter().map(|v| factor * v).collect());
            labels.push(CbcoLabel {
                line: line.clone(),
                outage: outage.clone(),
                sign,
            });
            pairs.push(twin_offset + i);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbmc_core::{Line, LodfMatrix, Node, PtdfMatrix, StaticGridModel, ZoneId};

    fn triangle() -> StaticGridModel {
        let topology = GridTopology::new(
            vec![ZoneId::new("A"), ZoneId::new("B")],
            vec![Node::new("n1", "A"), Node::new("n2", "A"), Node::new("n3", "B")],
            vec![
                Line::new("l12", "n1", "n2", 100.0),
                Line::new("l23", "n2", "n3", 100.0),
                Line::new("l13", "n1", "n3", 100.0).with_contingency(false),
            ],
        );
        let third = 1.0 / 3.0;
        let ptdf = PtdfMatrix::new(
            vec![
                vec![0.0, -2.0 * third, -third],
                vec![0.0, third, -third],
                vec![0.0, -third, -2.0 * third],
            ],
            3,
        )
        .unwrap();
        let lodf = LodfMatrix::new(vec![
            vec![-1.0, -1.0, 1.0],
            vec![-1.0, -1.0, 1.0],
            vec![1.0, 1.0, -1.0],
        ])
        .unwrap();
        StaticGridModel::new(topology, ptdf, lodf).unwrap()
    }

    #[test]
    fn test_plan_from_records_groups_by_line() {
        let grid = triangle();
        let records = vec![
            CbcoRecord::new("l12", "basecase"),
            CbcoRecord::new("l23", "l13"),
            CbcoRecord::new("l12", "l13"),
            CbcoRecord::new("l23", "l12"),
        ];
        let plan = CbcoPlan::from_records(grid.topology(), &records).unwrap();
        assert_eq!(plan.basecase, vec![LineId::new("l12")]);
        assert_eq!(
            plan.outages,
            vec![
                (LineId::new("l23"), vec![LineId::new("l13"), LineId::new("l12")]),
                (LineId::new("l12"), vec![LineId::new("l13")]),
            ]
        );
        assert_eq!(plan.num_constraints(), 4);
    }

    #[test]
    fn test_plan_from_records_rejects_unknown_line() {
        let grid = triangle();
        let err = CbcoPlan::from_records(grid.topology(), &[CbcoRecord::new("l99", "basecase")])
            .unwrap_err();
        assert!(matches!(err, FbmcError::UnknownLine(_)));
    }

    #[test]
    fn test_plan_from_critical_skips_ineligible_lines() {
        let grid = triangle();
        let critical = CriticalBranches {
            critical: vec![],
            cross_border: vec![LineId::new("l23"), LineId::new("l13")],
            selected: vec![LineId::new("l23"), LineId::new("l13")],
        };
        let plan = CbcoPlan::from_critical_branches(&grid, &critical, 0.1).unwrap();
        assert_eq!(plan.basecase, vec![LineId::new("l23")]);
        assert_eq!(plan.outages[0].1, vec![LineId::new("l12"), LineId::new("l13")]);
    }

    #[test]
    fn test_assembled_rows_and_sign_pairs() {
        let grid = triangle();
        let plan = CbcoPlan {
            basecase: vec![LineId::new("l12"), LineId::new("l23")],
            outages: vec![(LineId::new("l12"), vec![LineId::new("l13")])],
        };
        let ptdf = assemble_contingency_ptdf(&grid, &plan).unwrap();
        assert_eq!(ptdf.num_rows(), 2 * (2 + 1));

        for row in 0..ptdf.num_rows() {
            let twin = ptdf.pair_of(row).unwrap();
            assert_eq!(ptdf.pair_of(twin), Some(row));
            assert_eq!(ptdf.labels[row].line, ptdf.labels[twin].line);
            assert_eq!(ptdf.labels[row].outage, ptdf.labels[twin].outage);
            assert_ne!(ptdf.labels[row].sign, ptdf.labels[twin].sign);
            for (a, b) in ptdf.rows[row].iter().zip(&ptdf.rows[twin]) {
                assert_eq!(*a, -*b);
            }
        }

        // Block layout: +l12, +l23, -l12, -l23, +l12|l13, -l12|l13
        assert_eq!(ptdf.labels[1].line, LineId::new("l23"));
        assert_eq!(ptdf.labels[2].sign, Sign::Negative);
        assert_eq!(ptdf.labels[4].outage, Outage::Line(LineId::new("l13")));
        assert!((ptdf.rows[4][2] + 1.0).abs() < 1e-10);
        assert_eq!(ptdf.lines(), vec![&LineId::new("l12"), &LineId::new("l23")]);
    }

    #[test]
    fn test_grid_failure_propagates() {
        let grid = triangle();
        let plan = CbcoPlan {
            basecase: vec![],
            outages: vec![(LineId::new("l12"), vec![LineId::new("missing")])],
        };
        assert!(assemble_contingency_ptdf(&grid, &plan).is_err());
    }
}
