//! Capacitated network and its adjacency-list file format
//!
//! One line per vertex: `<json vertex>\t[[<json dest>, <capacity>], ...]`.
//! Destinations that never appear as a key still become vertices.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path as FsPath;

use crate::flow::{Edge, Path};
use crate::pregel::{AugmentationMap, PregelError, RoundInput, VertexId, VertexRecord};

/// Directed network with integer capacities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowNetwork {
    adjacency: BTreeMap<VertexId, BTreeMap<VertexId, i64>>,
}

impl FlowNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex with no edges (no-op if present)
    pub fn add_vertex(&mut self, id: impl Into<VertexId>) -> Result<(), PregelError> {
        let id = id.into();
        if id.is_reserved_key() {
            return Err(PregelError::config_error(format!(
                "{id} is reserved and cannot be a vertex id"
            )));
        }
        self.adjacency.entry(id).or_default();
        Ok(())
    }

    /// Add capacity on `from -> to`
    ///
    /// Parallel edges are merged by summing their capacities. Self-loops
    /// cannot carry flow and are dropped.
    pub fn add_edge(
        &mut self,
        from: impl Into<VertexId>,
        to: impl Into<VertexId>,
        capacity: i64,
    ) -> Result<(), PregelError> {
        let (from, to) = (from.into(), to.into());
        if capacity < 0 {
            return Err(PregelError::config_error(format!(
                "Negative capacity {capacity} on edge {from},{to}"
            )));
        }
        self.add_vertex(from.clone())?;
        self.add_vertex(to.clone())?;
        if from == to {
            tracing::warn!(vertex = %from, "Dropping self-loop");
            return Ok(());
        }
        if let Some(out) = self.adjacency.get_mut(&from) {
            *out.entry(to).or_insert(0) += capacity;
        }
        Ok(())
    }

    /// Parse the adjacency-list format; any malformed line is fatal
    pub fn parse(content: &str) -> Result<Self, PregelError> {
        let mut network = Self::new();
        for (index, text) in content.lines().enumerate() {
            let line = index + 1;
            if text.trim().is_empty() {
                continue;
            }
            let (key, value) = text
                .split_once('\t')
                .ok_or_else(|| PregelError::malformed(line, "missing tab separator"))?;
            let vertex: VertexId = serde_json::from_str(key)
                .map_err(|e| PregelError::malformed(line, format!("vertex: {e}")))?;
            let edges: Vec<(VertexId, i64)> = serde_json::from_str(value)
                .map_err(|e| PregelError::malformed(line, format!("edges: {e}")))?;

            network.add_vertex(vertex.clone())?;
            for (destination, capacity) in edges {
                network.add_edge(vertex.clone(), destination, capacity)?;
            }
        }
        Ok(network)
    }

    /// Read and parse a graph file
    pub async fn load(path: impl AsRef<FsPath>) -> Result<Self, PregelError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            PregelError::config_error(format!("Failed to read graph {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Serialize to the adjacency-list format
    pub fn to_lines(&self) -> Result<String, PregelError> {
        let mut out = String::new();
        for (vertex, edges) in &self.adjacency {
            let edges: Vec<(&VertexId, i64)> = edges.iter().map(|(to, cap)| (to, *cap)).collect();
            let key = serde_json::to_string(vertex)
                .map_err(|e| PregelError::state_error(format!("Failed to encode {vertex}: {e}")))?;
            let value = serde_json::to_string(&edges)
                .map_err(|e| PregelError::state_error(format!("Failed to encode {vertex}: {e}")))?;
            out.push_str(&key);
            out.push('\t');
            out.push_str(&value);
            out.push('\n');
        }
        Ok(out)
    }

    /// Write the adjacency-list file
    pub async fn save(&self, path: impl AsRef<FsPath>) -> Result<(), PregelError> {
        let path = path.as_ref();
        tokio::fs::write(path, self.to_lines()?).await.map_err(|e| {
            PregelError::config_error(format!("Failed to write graph {}: {e}", path.display()))
        })
    }

    /// Check if the vertex exists
    pub fn contains(&self, id: &VertexId) -> bool {
        self.adjacency.contains_key(id)
    }

    /// Capacity of `from -> to`, if the edge exists
    pub fn capacity(&self, from: &str, to: &str) -> Option<i64> {
        self.adjacency
            .get(&VertexId::new(from))?
            .get(&VertexId::new(to))
            .copied()
    }

    /// All vertices in id order
    pub fn vertices(&self) -> impl Iterator<Item = &VertexId> {
        self.adjacency.keys()
    }

    /// All edges as `(from, to, capacity)`
    pub fn edges(&self) -> impl Iterator<Item = (&VertexId, &VertexId, i64)> {
        self.adjacency
            .iter()
            .flat_map(|(from, out)| out.iter().map(move |(to, cap)| (from, to, *cap)))
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum()
    }

    /// Total capacity leaving the source
    pub fn source_capacity(&self) -> i64 {
        self.adjacency
            .get(&VertexId::source())
            .map(|out| out.values().sum())
            .unwrap_or(0)
    }

    /// Fail unless both `s` and `t` are present
    pub fn validate_endpoints(&self) -> Result<(), PregelError> {
        for endpoint in [VertexId::source(), VertexId::sink()] {
            if !self.contains(&endpoint) {
                return Err(PregelError::missing_endpoint(endpoint));
            }
        }
        Ok(())
    }

    /// Build the initial record of every vertex
    ///
    /// Each vertex owns its outgoing edges. Neighbours of `s` start with the
    /// one-edge source path `[s -> u]`; vertices with an edge into `t` start
    /// with the one-edge sink path `[u -> t]`.
    pub fn materialize(&self) -> Result<RoundInput, PregelError> {
        self.validate_endpoints()?;

        let mut records: BTreeMap<VertexId, VertexRecord> = BTreeMap::new();
        for (from, out) in &self.adjacency {
            let mut record = VertexRecord::default();
            for (to, capacity) in out {
                let edge = Edge::new(from.as_str(), to.as_str(), *capacity);
                if to.is_sink() {
                    record.sink_paths.push(Path::single(edge.clone()));
                }
                record.edges.push(edge);
            }
            records.insert(from.clone(), record);
        }

        if let Some(out) = self.adjacency.get(&VertexId::source()) {
            for (to, capacity) in out {
                if let Some(record) = records.get_mut(to) {
                    record.source_paths = vec![Path::single(Edge::new(
                        VertexId::source().as_str(),
                        to.as_str(),
                        *capacity,
                    ))];
                }
            }
        }

        Ok(RoundInput::new(records))
    }

    /// Check that `augmentation` is a feasible flow on this network
    ///
    /// Every entry must name an existing edge and stay within its capacity,
    /// and every vertex other than `s` and `t` must conserve flow.
    pub fn verify(&self, augmentation: &AugmentationMap) -> Result<(), PregelError> {
        let mut touched = BTreeSet::new();
        for (id, flow) in augmentation.iter() {
            let (from, to) = id
                .endpoints()
                .ok_or_else(|| PregelError::state_error(format!("Invalid edge id {id}")))?;
            let capacity = self
                .capacity(from, to)
                .ok_or_else(|| PregelError::state_error(format!("Flow on unknown edge {id}")))?;
            if flow < 0 || flow > capacity {
                return Err(PregelError::capacity_violation(id.clone(), flow, capacity));
            }
            touched.insert(VertexId::new(from));
            touched.insert(VertexId::new(to));
        }

        for vertex in touched {
            if vertex.is_source() || vertex.is_sink() {
                continue;
            }
            let net = augmentation.net_flow_into(&vertex);
            if net != 0 {
                return Err(PregelError::state_error(format!(
                    "Flow not conserved at {vertex}: net inflow {net}"
                )));
            }
        }
        Ok(())
    }
}
