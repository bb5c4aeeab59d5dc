//! Critical branch (CB) selection from zone-to-zone PTDFs.
//!
//! A line constrains cross-zonal trade when a commercial exchange between
//! two zones of the flow-based region moves a noticeable share of it across
//! that line:
//! ```text
//! z2z_PTDF[ℓ, z→zz] = zonal_PTDF[ℓ,z] - zonal_PTDF[ℓ,zz]
//! ℓ critical  ⇔  max_{z,zz ∈ region} |z2z_PTDF[ℓ, z→zz]| > threshold
//! ```
//!
//! Lines connecting two different zones of the region (cross-border lines)
//! are always selected regardless of their sensitivity.

use crate::gsk::GskMatrix;
use fbmc_core::{FbmcResult, GridModel, GridTopology, LineId, ZoneId};
use std::collections::HashSet;
use tracing::{info, warn};

/// Outcome of a critical branch selection.
#[derive(Debug, Clone, Default)]
pub struct CriticalBranches {
    /// Lines exceeding the zone-to-zone PTDF threshold
    pub critical: Vec<LineId>,
    /// Lines between two different zones of the flow-based region
    pub cross_border: Vec<LineId>,
    /// Deduplicated union of both, in topology line order
    pub selected: Vec<LineId>,
}

impl CriticalBranches {
    pub fn contains(&self, line: &LineId) -> bool {
        self.selected.contains(line)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Select the critical branches of `grid` for the given flow-based region.
pub fn select_critical_branches<G: GridModel + ?Sized>(
    grid: &G,
    gsk: &GskMatrix,
    flowbased_region: &[ZoneId],
    threshold: f64,
) -> FbmcResult<CriticalBranches> {
    let topology = grid.topology();
    info!(
        "List of CBs is generated from zone-to-zone PTDFs with GSK strategy {}, threshold {:.1}%",
        gsk.strategy,
        threshold * 100.0
    );

    let region = region_indices(topology, flowbased_region);
    let zonal = gsk.zonal_ptdf(&grid.ptdf().values)?;

    let mut critical = Vec::new();
    let mut cross_border = Vec::new();
    let mut selected = Vec::new();

    for (line_idx, line) in topology.lines.iter().enumerate() {
        let row = &zonal[line_idx];
        let is_critical = region.iter().any(|&z| {
            region
                .iter()
                .filter(|&&zz| zz != z)
                .any(|&zz| (row[z] - row[zz]).abs() > threshold)
        });

        let zone_i = topology.zone_of(&line.node_i);
        let zone_j = topology.zone_of(&line.node_j);
        let is_cross_border = match (zone_i, zone_j) {
            (Some(zi), Some(zj)) => {
                zi != zj && flowbased_region.contains(zi) && flowbased_region.contains(zj)
            }
            _ => false,
        };

        if is_critical {
            critical.push(line.id.clone());
        }
        if is_cross_border {
            cross_border.push(line.id.clone());
        }
        if is_critical || is_cross_border {
            selected.push(line.id.clone());
        }
    }

    info!(
        critical = critical.len(),
        cross_border = cross_border.len(),
        total = selected.len(),
        "critical branch selection done"
    );

    Ok(CriticalBranches {
        critical,
        cross_border,
        selected,
    })
}

/// Zone column indices of the region, skipping zones the topology lacks.
fn region_indices(topology: &GridTopology, flowbased_region: &[ZoneId]) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut indices = Vec::with_capacity(flowbased_region.len());
    for zone in flowbased_region {
        match topology.zone_index(zone) {
            Some(idx) => {
                if seen.insert(idx) {
                    indices.push(idx);
                }
            }
            None => warn!(zone = %zone, "flow-based region zone not in topology, ignored"),
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gsk::build_gsk;
    use fbmc_core::{
        GskStrategy, Line, LodfMatrix, Node, PlantTypes, PtdfMatrix, StaticGridModel,
    };

    /// n1 (A) - n2 (A) - n3 (B), radial, slack at n1.
    fn radial() -> StaticGridModel {
        let topology = GridTopology::new(
            vec![ZoneId::new("A"), ZoneId::new("B")],
            vec![Node::new("n1", "A"), Node::new("n2", "A"), Node::new("n3", "B")],
            vec![
                Line::new("l12", "n1", "n2", 100.0),
                Line::new("l23", "n2", "n3", 100.0),
            ],
        );
        let ptdf = PtdfMatrix::new(
            vec![vec![0.0, -1.0, -1.0], vec![0.0, 0.0, -1.0]],
            3,
        )
        .unwrap();
        let lodf = LodfMatrix::new(vec![
            vec![-1.0, f64::INFINITY],
            vec![f64::INFINITY, -1.0],
        ])
        .unwrap();
        StaticGridModel::new(topology, ptdf, lodf).unwrap()
    }

    fn region() -> Vec<ZoneId> {
        vec![ZoneId::new("A"), ZoneId::new("B")]
    }

    #[test]
    fn test_threshold_selection() {
        let grid = radial();
        let gsk = build_gsk(grid.topology(), &[], &PlantTypes::default(), GskStrategy::Flat);
        // zonal A = [-0.5, 0], zonal B = [-1, -1] -> z2z = [0.5, 1.0]
        let cbs = select_critical_branches(&grid, &gsk, &region(), 0.6).unwrap();
        assert_eq!(cbs.critical, vec![LineId::new("l23")]);
        assert_eq!(cbs.cross_border, vec![LineId::new("l23")]);
        assert_eq!(cbs.selected, vec![LineId::new("l23")]);

        let cbs = select_critical_branches(&grid, &gsk, &region(), 0.4).unwrap();
        assert_eq!(cbs.selected, vec![LineId::new("l12"), LineId::new("l23")]);
    }

    #[test]
    fn test_cross_border_requires_region() {
        let grid = radial();
        let gsk = build_gsk(grid.topology(), &[], &PlantTypes::default(), GskStrategy::Flat);
        let only_a = vec![ZoneId::new("A"), ZoneId::new("XX")];
        let cbs = select_critical_branches(&grid, &gsk, &only_a, 0.0).unwrap();
        assert!(cbs.cross_border.is_empty());
        // a single region zone has no zone pairs
        assert!(cbs.critical.is_empty());
        assert!(cbs.is_empty());
    }
}
