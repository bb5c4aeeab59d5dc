//! Generation shift keys (GSK): node → zone allocation matrices.
//!
//! A GSK distributes a 1 MW change of a zone's net position over the nodes of
//! that zone. Column `z` is zero outside zone `z` and sums to one inside it:
//! ```text
//! Σ_n GSK[n,z] = 1         for every zone z with at least one node
//! zonal_PTDF = nodal_PTDF · GSK
//! ```
//!
//! Two strategies are supported, see [`GskStrategy`]:
//! - **Flat**: `1/|z|` for every node of zone `z`
//! - **Gmax**: proportional to the dispatchable capacity (`g_max`) at each
//!   node, excluding time-series driven and storage plant types. Zones
//!   without dispatchable capacity fall back to flat.

use fbmc_core::{
    FbmcError, FbmcResult, GridTopology, GskStrategy, NodeId, Plant, PlantTypes, ZoneId,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Node × zone allocation matrix.
#[derive(Debug, Clone)]
pub struct GskMatrix {
    pub strategy: GskStrategy,
    /// Column index → zone
    pub zones: Vec<ZoneId>,
    /// GSK values: values[node_idx][zone_idx]
    pub values: Vec<Vec<f64>>,
}

impl GskMatrix {
    pub fn num_nodes(&self) -> usize {
        self.values.len()
    }

    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    /// Sum of column `zone_idx` (1.0 for populated zones).
    pub fn column_sum(&self, zone_idx: usize) -> f64 {
        self.values.iter().map(|row| row[zone_idx]).sum()
    }

    /// Project nodal sensitivity rows onto zones.
    ///
    /// `zonal[r][z] = Σ_n nodal[r][n] · GSK[n][z]`
    pub fn zonal_ptdf(&self, nodal: &[Vec<f64>]) -> FbmcResult<Vec<Vec<f64>>> {
        let n_nodes = self.num_nodes();
        let n_zones = self.num_zones();
        let mut zonal = Vec::with_capacity(nodal.len());
        for row in nodal {
            if row.len() != n_nodes {
                return Err(FbmcError::dimension(
                    "nodal PTDF columns vs GSK rows",
                    n_nodes,
                    row.len(),
                ));
            }
            let mut out = vec![0.0; n_zones];
            for (n, &factor) in row.iter().enumerate() {
                if factor == 0.0 {
                    continue;
                }
                for (z, weight) in self.values[n].iter().enumerate() {
                    out[z] += factor * weight;
                }
            }
            zonal.push(out);
        }
        Ok(zonal)
    }
}

/// Build the GSK for `topology` under `strategy`.
///
/// `plants` and `plant_types` are only consulted for [`GskStrategy::Gmax`].
pub fn build_gsk(
    topology: &GridTopology,
    plants: &[Plant],
    plant_types: &PlantTypes,
    strategy: GskStrategy,
) -> GskMatrix {
    let n_nodes = topology.num_nodes();
    let n_zones = topology.num_zones();
    let mut values = vec![vec![0.0; n_zones]; n_nodes];

    let gmax_per_node = match strategy {
        GskStrategy::Gmax => dispatchable_capacity(topology, plants, plant_types),
        GskStrategy::Flat => HashMap::new(),
    };

    for (zone_idx, zone) in topology.zones.iter().enumerate() {
        let nodes: Vec<usize> = topology.nodes_in_zone(zone).collect();
        if nodes.is_empty() {
            warn!(zone = %zone, "zone has no nodes, GSK column left at zero");
            continue;
        }

        let zone_gmax: f64 = nodes
            .iter()
            .filter_map(|idx| gmax_per_node.get(idx))
            .sum();

        if strategy == GskStrategy::Gmax && zone_gmax > 0.0 {
            for &idx in &nodes {
                if let Some(gmax) = gmax_per_node.get(&idx) {
                    values[idx][zone_idx] = gmax / zone_gmax;
                }
            }
        } else {
            if strategy == GskStrategy::Gmax {
                debug!(zone = %zone, "no dispatchable capacity, using flat GSK");
            }
            let share = 1.0 / nodes.len() as f64;
            for &idx in &nodes {
                values[idx][zone_idx] = share;
            }
        }
    }

    GskMatrix {
        strategy,
        zones: topology.zones.clone(),
        values,
    }
}

/// Dispatchable `g_max` summed per node index.
fn dispatchable_capacity(
    topology: &GridTopology,
    plants: &[Plant],
    plant_types: &PlantTypes,
) -> HashMap<usize, f64> {
    let mut per_node: HashMap<usize, f64> = HashMap::new();
    let mut unknown: Vec<&NodeId> = Vec::new();
    for plant in plants {
        if !plant_types.is_dispatchable(&plant.plant_type) {
            continue;
        }
        match topology.node_index(&plant.node) {
            Some(idx) => *per_node.entry(idx).or_insert(0.0) += plant.g_max,
            None => unknown.push(&plant.node),
        }
    }
    if !unknown.is_empty() {
        debug!(count = unknown.len(), "plants at unknown nodes ignored for GSK");
    }
    per_node
}
