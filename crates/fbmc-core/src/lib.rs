//! # fbmc-core: Grid and Market Data Model for Flow-Based Market Coupling
//!
//! Provides the static network description, base-case market results and the
//! collaborator contracts that the flow-based domain computation consumes.
//!
//! ## Design Philosophy
//!
//! The transmission network is described as **ordered tables**:
//! - **Nodes**: buses, each owned by exactly one market zone
//! - **Lines**: branches between two nodes with a thermal limit (`maxflow`)
//! - **Zones**: market areas partitioning the nodes
//!
//! The order of each table is significant. Node order defines the columns of
//! every nodal PTDF matrix and the rows of the allocation key; line order
//! defines the rows of the base-case PTDF; zone order defines the columns of
//! every zonal sensitivity matrix.
//!
//! ## Quick Start
//!
//! ```rust
//! use fbmc_core::*;
//!
//! let topology = GridTopology::new(
//!     vec![ZoneId::new("DE"), ZoneId::new("FR")],
//!     vec![
//!         Node::new("n1", "DE"),
//!         Node::new("n2", "DE"),
//!         Node::new("n3", "FR"),
//!     ],
//!     vec![
//!         Line::new("l1", "n1", "n2", 100.0),
//!         Line::new("l2", "n2", "n3", 200.0),
//!     ],
//! );
//!
//! assert!(topology.validate().is_ok());
//! assert_eq!(topology.nodes_in_zone(&ZoneId::new("DE")).count(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`grid`] - The grid model contract and an in-memory implementation
//! - [`results`] - Base-case market results (injections, net positions)
//! - [`options`] - Model options and FBMC configuration
//! - [`diagnostics`] - Warning/error collection for observable clamping
//! - [`error`] - The unified [`FbmcError`] type

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod options;
pub mod results;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{FbmcError, FbmcResult};
pub use grid::{GridModel, LodfMatrix, PtdfMatrix, StaticGridModel};
pub use options::{
    FbmcConfig, GridOptions, GskStrategy, ModelOptions, OptimizationOptions, PlantTypes,
};
pub use results::{BaseCaseResult, InjectionRecord, NetPositionRecord, ResultStore};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a network node (bus).
    NodeId
);
string_id!(
    /// Identifier of a transmission line (branch).
    LineId
);
string_id!(
    /// Identifier of a market zone.
    ZoneId
);

/// Textual label of the N-0 (no outage) case.
pub const BASECASE: &str = "basecase";

/// Outage attached to a critical branch.
///
/// Serialised as `"basecase"` for the N-0 case and as the outaged line id
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Outage {
    /// No element out of service (N-0)
    Basecase,
    /// Single line out of service (N-1)
    Line(LineId),
}

impl Outage {
    pub fn is_basecase(&self) -> bool {
        matches!(self, Outage::Basecase)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Outage::Basecase => BASECASE,
            Outage::Line(id) => id.as_str(),
        }
    }
}

impl fmt::Display for Outage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Outage {
    fn from(value: String) -> Self {
        if value == BASECASE {
            Outage::Basecase
        } else {
            Outage::Line(LineId(value))
        }
    }
}

impl From<&str> for Outage {
    fn from(value: &str) -> Self {
        Outage::from(value.to_string())
    }
}

impl From<Outage> for String {
    fn from(value: Outage) -> Self {
        match value {
            Outage::Basecase => BASECASE.to_string(),
            Outage::Line(id) => id.0,
        }
    }
}

/// Network bus with its owning market zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub zone: ZoneId,
}

impl Node {
    pub fn new(id: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            zone: ZoneId::new(zone),
        }
    }
}

/// Transmission line between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub node_i: NodeId,
    pub node_j: NodeId,
    /// Symmetric thermal limit (MW)
    pub maxflow: f64,
    /// Whether the line is eligible as a monitored branch under contingencies
    #[serde(default = "default_contingency")]
    pub contingency: bool,
}

fn default_contingency() -> bool {
    true
}

impl Line {
    /// Construct a contingency-eligible line.
    pub fn new(
        id: impl Into<String>,
        node_i: impl Into<String>,
        node_j: impl Into<String>,
        maxflow: f64,
    ) -> Self {
        Self {
            id: LineId::new(id),
            node_i: NodeId::new(node_i),
            node_j: NodeId::new(node_j),
            maxflow,
            contingency: true,
        }
    }

    /// Set the contingency eligibility flag.
    pub fn with_contingency(mut self, contingency: bool) -> Self {
        self.contingency = contingency;
        self
    }
}

/// Generation unit; only `g_max` and `plant_type` matter for allocation keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub node: NodeId,
    pub plant_type: String,
    pub g_max: f64,
}

impl Plant {
    pub fn new(
        id: impl Into<String>,
        node: impl Into<String>,
        plant_type: impl Into<String>,
        g_max: f64,
    ) -> Self {
        Self {
            id: id.into(),
            node: NodeId::new(node),
            plant_type: plant_type.into(),
            g_max,
        }
    }
}

/// Ordered node, line and zone tables of a transmission network.
#[derive(Debug, Clone)]
pub struct GridTopology {
    pub zones: Vec<ZoneId>,
    pub nodes: Vec<Node>,
    pub lines: Vec<Line>,
    node_to_idx: HashMap<NodeId, usize>,
    line_to_idx: HashMap<LineId, usize>,
    zone_to_idx: HashMap<ZoneId, usize>,
}

impl GridTopology {
    pub fn new(zones: Vec<ZoneId>, nodes: Vec<Node>, lines: Vec<Line>) -> Self {
        let node_to_idx = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let line_to_idx = lines
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id.clone(), i))
            .collect();
        let zone_to_idx = zones
            .iter()
            .enumerate()
            .map(|(i, z)| (z.clone(), i))
            .collect();
        Self {
            zones,
            nodes,
            lines,
            node_to_idx,
            line_to_idx,
            zone_to_idx,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.node_to_idx.get(id).copied()
    }

    pub fn line_index(&self, id: &LineId) -> Option<usize> {
        self.line_to_idx.get(id).copied()
    }

    pub fn zone_index(&self, id: &ZoneId) -> Option<usize> {
        self.zone_to_idx.get(id).copied()
    }

    pub fn line(&self, id: &LineId) -> Option<&Line> {
        self.line_index(id).map(|idx| &self.lines[idx])
    }

    /// Zone owning a node, if the node is known.
    pub fn zone_of(&self, node: &NodeId) -> Option<&ZoneId> {
        self.node_index(node).map(|idx| &self.nodes[idx].zone)
    }

    /// Indices of the nodes belonging to `zone`, in node order.
    pub fn nodes_in_zone<'a>(&'a self, zone: &'a ZoneId) -> impl Iterator<Item = usize> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| &n.zone == zone)
            .map(|(i, _)| i)
    }

    /// Check identifier uniqueness and that every reference resolves.
    pub fn validate(&self) -> FbmcResult<()> {
        let mut diag = Diagnostics::new();

        if self.node_to_idx.len() != self.nodes.len() {
            diag.add_error("topology", "duplicate node identifiers");
        }
        if self.line_to_idx.len() != self.lines.len() {
            diag.add_error("topology", "duplicate line identifiers");
        }
        if self.zone_to_idx.len() != self.zones.len() {
            diag.add_error("topology", "duplicate zone identifiers");
        }

        for node in &self.nodes {
            if !self.zone_to_idx.contains_key(&node.zone) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("zone '{}' is not declared", node.zone),
                    &format!("Node {}", node.id),
                );
            }
        }

        for line in &self.lines {
            for end in [&line.node_i, &line.node_j] {
                if !self.node_to_idx.contains_key(end) {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("endpoint '{}' is not a known node", end),
                        &format!("Line {}", line.id),
                    );
                }
            }
            if !(line.maxflow.is_finite() && line.maxflow >= 0.0) {
                diag.add_error_with_entity(
                    "physical",
                    "maxflow must be finite and non-negative",
                    &format!("Line {}", line.id),
                );
            }
        }

        let populated: HashSet<&ZoneId> = self.nodes.iter().map(|n| &n.zone).collect();
        for zone in &self.zones {
            if !populated.contains(zone) {
                diag.add_warning_with_entity(
                    "topology",
                    "zone has no nodes",
                    &format!("Zone {}", zone),
                );
            }
        }

        if diag.has_errors() {
            return Err(FbmcError::Validation(diag.to_string()));
        }
        Ok(())
    }
}
