//! Edge and Path model
//!
//! Edges travel by value inside paths: every copy carries the flow known as
//! of the previous round, refreshed by the owning vertex program when the
//! round's deltas are applied. On the wire an edge is the positional tuple
//! `[destination, id, flow, capacity]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::pregel::{AugmentationMap, VertexId};

/// Edge identifier derived from the ordered endpoint pair: `"<from>,<to>"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Build the id of the edge `from -> to`
    pub fn between(from: impl AsRef<str>, to: impl AsRef<str>) -> Self {
        Self(format!("{},{}", from.as_ref(), to.as_ref()))
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the id back into `(from, to)`
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        self.0.split_once(',')
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed, capacitated edge with the flow committed on it so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireEdge", into = "WireEdge")]
pub struct Edge {
    pub destination: VertexId,
    pub id: EdgeId,
    pub flow: i64,
    pub capacity: i64,
}

/// Positional wire form of an edge
#[derive(Serialize, Deserialize)]
struct WireEdge(VertexId, EdgeId, i64, i64);

impl From<WireEdge> for Edge {
    fn from(WireEdge(destination, id, flow, capacity): WireEdge) -> Self {
        Self {
            destination,
            id,
            flow,
            capacity,
        }
    }
}

impl From<Edge> for WireEdge {
    fn from(edge: Edge) -> Self {
        WireEdge(edge.destination, edge.id, edge.flow, edge.capacity)
    }
}

impl Edge {
    /// Create an edge `from -> to` with no flow
    pub fn new(from: impl AsRef<str>, to: impl AsRef<str>, capacity: i64) -> Self {
        Self {
            destination: VertexId::new(to.as_ref()),
            id: EdgeId::between(from, to),
            flow: 0,
            capacity,
        }
    }

    /// Capacity not yet committed
    pub fn residual(&self) -> i64 {
        self.capacity - self.flow
    }

    /// Check if the edge can carry no more flow
    pub fn is_saturated(&self) -> bool {
        self.flow >= self.capacity
    }

    /// Add this edge's delta from the previous round.
    ///
    /// Returns true when the edge received a delta and is now saturated.
    pub fn apply_delta(&mut self, delta: &AugmentationMap) -> bool {
        if !delta.contains(&self.id) {
            return false;
        }
        self.flow += delta.get(&self.id);
        self.is_saturated()
    }

    /// Vertex this edge leaves from, recovered from its id
    pub fn origin(&self) -> Option<&str> {
        self.id.endpoints().map(|(from, _)| from)
    }
}

/// An ordered, acyclic sequence of edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Edge>);

impl Path {
    /// Create a path of one edge
    pub fn single(edge: Edge) -> Self {
        Self(vec![edge])
    }

    /// Create a path from edges, rejecting sequences that revisit a vertex
    pub fn from_edges(edges: Vec<Edge>) -> Option<Self> {
        let mut path = Path::default();
        for edge in edges {
            if path.would_cycle(&edge) {
                return None;
            }
            path.0.push(edge);
        }
        Some(path)
    }

    /// Edges in order
    pub fn edges(&self) -> &[Edge] {
        &self.0
    }

    /// Mutable edges in order
    pub fn edges_mut(&mut self) -> std::slice::IterMut<'_, Edge> {
        self.0.iter_mut()
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the path has no edges
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Vertex the path starts from
    pub fn origin(&self) -> Option<&str> {
        self.0.first().and_then(Edge::origin)
    }

    /// Vertex the path ends at
    pub fn terminus(&self) -> Option<&VertexId> {
        self.0.last().map(|edge| &edge.destination)
    }

    /// Check if the path passes through `vertex` (origin included)
    pub fn visits(&self, vertex: &VertexId) -> bool {
        self.origin() == Some(vertex.as_str())
            || self.0.iter().any(|edge| &edge.destination == vertex)
    }

    /// Check if appending `edge` would revisit a vertex already on the path
    pub fn would_cycle(&self, edge: &Edge) -> bool {
        self.visits(&edge.destination)
    }

    /// Copy of this path extended by one edge
    pub fn extended(&self, edge: Edge) -> Self {
        let mut edges = self.0.clone();
        edges.push(edge);
        Self(edges)
    }

    /// Concatenate `tail` after this path if the result stays acyclic
    pub fn join(&self, tail: &Path) -> Option<Self> {
        let mut edges = self.0.clone();
        edges.extend(tail.0.iter().cloned());
        Self::from_edges(edges)
    }

    /// Check if any edge on the path is in `edge_ids`
    pub fn contains_any(&self, edge_ids: &BTreeSet<EdgeId>) -> bool {
        self.0.iter().any(|edge| edge_ids.contains(&edge.id))
    }

    /// Stable ordering key: edge ids joined with `;`
    pub fn signature(&self) -> String {
        self.0
            .iter()
            .map(|edge| edge.id.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_id_endpoints() {
        let id = EdgeId::between("s", "a");
        assert_eq!(id.as_str(), "s,a");
        assert_eq!(id.endpoints(), Some(("s", "a")));
    }

    #[test]
    fn test_edge_wire_form() {
        let mut edge = Edge::new("s", "a", 10);
        edge.flow = 4;
        let json = serde_json::to_string(&edge).unwrap();
        assert_eq!(json, r#"["a","s,a",4,10]"#);

        let back: Edge = serde_json::from_str(&json).unwrap();
        assert_eq!(back, edge);
        assert_eq!(back.origin(), Some("s"));
    }

    #[test]
    fn test_apply_delta_reports_saturation() {
        let mut edge = Edge::new("a", "t", 5);
        let delta: AugmentationMap = [(EdgeId::between("a", "t"), 5)].into_iter().collect();
        assert!(edge.apply_delta(&delta));
        assert_eq!(edge.flow, 5);
        assert_eq!(edge.residual(), 0);

        // Already saturated but no delta this round: not reported again
        assert!(!edge.apply_delta(&AugmentationMap::new()));
        assert!(edge.is_saturated());
    }

    #[test]
    fn test_extension_rejects_cycle_back_to_visited_vertex() {
        let path = Path::from_edges(vec![Edge::new("s", "a", 1), Edge::new("a", "b", 1)]).unwrap();

        assert!(path.would_cycle(&Edge::new("b", "a", 1)));
        assert!(!path.would_cycle(&Edge::new("b", "c", 1)));
    }

    #[test]
    fn test_extension_rejects_return_to_origin() {
        let path = Path::single(Edge::new("s", "a", 1));
        assert!(path.would_cycle(&Edge::new("a", "s", 1)));
    }

    #[test]
    fn test_extended_and_terminus() {
        let path = Path::single(Edge::new("s", "a", 1));
        let longer = path.extended(Edge::new("a", "b", 1));
        assert_eq!(path.len(), 1);
        assert_eq!(longer.len(), 2);
        assert_eq!(longer.origin(), Some("s"));
        assert_eq!(longer.terminus(), Some(&VertexId::new("b")));
        assert_eq!(longer.signature(), "s,a;a,b");
    }

    #[test]
    fn test_join_checks_acyclicity() {
        let head = Path::from_edges(vec![Edge::new("s", "a", 1), Edge::new("a", "b", 1)]).unwrap();
        let tail = Path::single(Edge::new("b", "t", 1));
        let full = head.join(&tail).unwrap();
        assert_eq!(full.signature(), "s,a;a,b;b,t");

        let looping = Path::from_edges(vec![Edge::new("b", "a", 1), Edge::new("a", "t", 1)]).unwrap();
        assert!(head.join(&looping).is_none());
    }

    #[test]
    fn test_from_edges_rejects_cycles() {
        assert!(Path::from_edges(vec![
            Edge::new("s", "a", 1),
            Edge::new("a", "b", 1),
            Edge::new("b", "a", 1),
        ])
        .is_none());
    }

    #[test]
    fn test_contains_any() {
        let path = Path::from_edges(vec![Edge::new("s", "a", 1), Edge::new("a", "t", 1)]).unwrap();
        let saturated: BTreeSet<EdgeId> = [EdgeId::between("a", "t")].into_iter().collect();
        assert!(path.contains_any(&saturated));
        assert!(!path.contains_any(&BTreeSet::new()));
    }
}
