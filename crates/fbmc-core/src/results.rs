//! Base-case market results consumed by the flow-based domain computation.
//!
//! A [`BaseCaseResult`] carries the nodal injections and zonal net positions
//! of one market run, the plant table used for allocation keys and the
//! [`ModelOptions`] the run was made with. Several results can be held in a
//! [`ResultStore`]; exactly one of them is selected as the base case.

use crate::error::{FbmcError, FbmcResult};
use crate::options::ModelOptions;
use crate::{GridTopology, NodeId, Plant, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Nodal injection of one timestep (MW, generation positive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionRecord {
    pub timestep: String,
    pub node: NodeId,
    pub injection: f64,
}

impl InjectionRecord {
    pub fn new(timestep: impl Into<String>, node: impl Into<String>, injection: f64) -> Self {
        Self {
            timestep: timestep.into(),
            node: NodeId::new(node),
            injection,
        }
    }
}

/// Scheduled net export of a zone in one timestep (MW).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetPositionRecord {
    pub timestep: String,
    pub zone: ZoneId,
    pub net_position: f64,
}

impl NetPositionRecord {
    pub fn new(timestep: impl Into<String>, zone: impl Into<String>, net_position: f64) -> Self {
        Self {
            timestep: timestep.into(),
            zone: ZoneId::new(zone),
            net_position,
        }
    }
}

/// One market run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseCaseResult {
    pub name: String,
    #[serde(default)]
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub injections: Vec<InjectionRecord>,
    #[serde(default)]
    pub net_positions: Vec<NetPositionRecord>,
    #[serde(default)]
    pub options: ModelOptions,
}

impl BaseCaseResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_plants(mut self, plants: Vec<Plant>) -> Self {
        self.plants = plants;
        self
    }

    pub fn with_injections(mut self, injections: Vec<InjectionRecord>) -> Self {
        self.injections = injections;
        self
    }

    pub fn with_net_positions(mut self, net_positions: Vec<NetPositionRecord>) -> Self {
        self.net_positions = net_positions;
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    /// Distinct timesteps of the injection table, in first-appearance order.
    pub fn timesteps(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.injections
            .iter()
            .filter(|r| seen.insert(r.timestep.as_str()))
            .map(|r| r.timestep.clone())
            .collect()
    }

    /// Injection vector of `timestep` in topology node order.
    ///
    /// Nodes without a record inject zero. Records for unknown nodes are ignored.
    pub fn injection(&self, timestep: &str, topology: &GridTopology) -> FbmcResult<Vec<f64>> {
        let mut injection = vec![0.0; topology.num_nodes()];
        let mut found = false;
        for record in self.injections.iter().filter(|r| r.timestep == timestep) {
            found = true;
            if let Some(idx) = topology.node_index(&record.node) {
                injection[idx] += record.injection;
            }
        }
        if !found {
            return Err(FbmcError::UnknownTimestep(timestep.to_string()));
        }
        Ok(injection)
    }

    /// Net-position vector of `timestep` in topology zone order.
    ///
    /// Zones without a record have a zero net position.
    pub fn net_position(&self, timestep: &str, topology: &GridTopology) -> Vec<f64> {
        let mut net_position = vec![0.0; topology.num_zones()];
        for record in self.net_positions.iter().filter(|r| r.timestep == timestep) {
            if let Some(idx) = topology.zone_index(&record.zone) {
                net_position[idx] += record.net_position;
            }
        }
        net_position
    }
}

/// Market results keyed by name, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Vec<BaseCaseResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, replacing any previous result with the same name.
    pub fn insert(&mut self, result: BaseCaseResult) {
        match self.results.iter_mut().find(|r| r.name == result.name) {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    pub fn get(&self, name: &str) -> Option<&BaseCaseResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Pick the base case.
    ///
    /// A single result is used as is; with several results `name` is required.
    /// A given `name` must always exist.
    pub fn select_basecase(&self, name: Option<&str>) -> FbmcResult<&BaseCaseResult> {
        if self.results.is_empty() {
            return Err(FbmcError::NoBaseCase);
        }
        match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| FbmcError::UnknownBaseCase(name.to_string())),
            None if self.results.len() == 1 => Ok(&self.results[0]),
            None => Err(FbmcError::AmbiguousBaseCase(
                self.results.len(),
                self.names().collect::<Vec<_>>().join(", "),
            )),
        }
    }
}

impl FromIterator<BaseCaseResult> for ResultStore {
    fn from_iter<I: IntoIterator<Item = BaseCaseResult>>(iter: I) -> Self {
        let mut store = ResultStore::new();
        for result in iter {
            store.insert(result);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Line, Node};

    fn topology() -> GridTopology {
        GridTopology::new(
            vec![ZoneId::new("A"), ZoneId::new("B")],
            vec![Node::new("n1", "A"), Node::new("n2", "B")],
            vec![Line::new("l1", "n1", "n2", 10.0)],
        )
    }

    #[test]
    fn test_select_basecase() {
        let empty = ResultStore::new();
        assert!(matches!(empty.select_basecase(None), Err(FbmcError::NoBaseCase)));

        let single: ResultStore = [BaseCaseResult::new("dispatch")].into_iter().collect();
        assert_eq!(single.select_basecase(None).unwrap().name, "dispatch");

        let many: ResultStore = [BaseCaseResult::new("a"), BaseCaseResult::new("b")]
            .into_iter()
            .collect();
        assert!(matches!(
            many.select_basecase(None),
            Err(FbmcError::AmbiguousBaseCase(2, _))
        ));
        assert_eq!(many.select_basecase(Some("b")).unwrap().name, "b");
        assert!(matches!(
            many.select_basecase(Some("c")),
            Err(FbmcError::UnknownBaseCase(_))
        ));
    }

    #[test]
    fn test_timesteps_keep_first_appearance_order() {
        let result = BaseCaseResult::new("r").with_injections(vec![
            InjectionRecord::new("t2", "n1", 1.0),
            InjectionRecord::new("t1", "n1", 1.0),
            InjectionRecord::new("t2", "n2", -1.0),
        ]);
        assert_eq!(result.timesteps(), vec!["t2".to_string(), "t1".to_string()]);
    }

    #[test]
    fn test_vectors_follow_topology_order() {
        let topo = topology();
        let result = BaseCaseResult::new("r")
            .with_injections(vec![
                InjectionRecord::new("t1", "n2", -5.0),
                InjectionRecord::new("t1", "n1", 5.0),
            ])
            .with_net_positions(vec![NetPositionRecord::new("t1", "B", -5.0)]);

        assert_eq!(result.injection("t1", &topo).unwrap(), vec![5.0, -5.0]);
        assert_eq!(result.net_position("t1", &topo), vec![0.0, -5.0]);
        assert!(matches!(
            result.injection("t9", &topo),
            Err(FbmcError::UnknownTimestep(_))
        ));
    }
}
