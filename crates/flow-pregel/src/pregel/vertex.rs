//! Vertex abstractions for the superstep runtime
//!
//! A vertex owns its record for the duration of one round. Vertex programs
//! never read another vertex's record; they only emit messages through the
//! [`ComputeContext`] outbox, which the runtime shuffles by target key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::message::FlowMessage;
use super::state::AugmentationMap;
use crate::flow::{Edge, Path};

/// Reserved id of the source vertex
pub const SOURCE: &str = "s";

/// Reserved id of the sink vertex
pub const SINK: &str = "t";

/// Reserved round-output key carrying the accepted augmentation map
pub const AUGMENTATION_KEY: &str = "A_p";

/// Unique identifier for a vertex in the flow network
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub String);

impl VertexId {
    /// Create a new VertexId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved source vertex `s`
    pub fn source() -> Self {
        Self::new(SOURCE)
    }

    /// The reserved sink vertex `t`
    pub fn sink() -> Self {
        Self::new(SINK)
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the source vertex
    pub fn is_source(&self) -> bool {
        self.0 == SOURCE
    }

    /// Check if this is the sink vertex
    pub fn is_sink(&self) -> bool {
        self.0 == SINK
    }

    /// Check if this id collides with a reserved round-output key
    pub fn is_reserved_key(&self) -> bool {
        self.0 == AUGMENTATION_KEY
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-vertex state carried from one round to the next
///
/// Replaced wholesale every round: the mapper reads an owned copy and the
/// reducer produces a fresh record for the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRecord {
    /// Partial augmenting paths from `s` ending at this vertex
    pub source_paths: Vec<Path>,
    /// Partial augmenting paths from this vertex ending at `t`
    pub sink_paths: Vec<Path>,
    /// Outgoing edges owned by this vertex
    pub edges: Vec<Edge>,
}

impl VertexRecord {
    /// Create a record holding only outgoing edges
    pub fn with_edges(edges: Vec<Edge>) -> Self {
        Self {
            edges,
            ..Default::default()
        }
    }

    /// Check if the record carries no paths and no edges
    pub fn is_empty(&self) -> bool {
        self.source_paths.is_empty() && self.sink_paths.is_empty() && self.edges.is_empty()
    }

    /// Every edge the record references, owned or inside a stored path
    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.iter_mut().chain(
            self.source_paths
                .iter_mut()
                .chain(self.sink_paths.iter_mut())
                .flat_map(|path| path.edges_mut()),
        )
    }
}

/// Context provided to a vertex program during one round
///
/// Provides access to:
/// - The current superstep
/// - The previous round's accepted deltas (read-only snapshot)
/// - An outbox for messages keyed by target vertex
pub struct ComputeContext<'a> {
    /// Current superstep number (0-indexed)
    pub superstep: usize,
    /// Deltas accepted in the previous round
    pub delta: &'a AugmentationMap,
    /// Outgoing messages (target vertex -> messages in emission order)
    outbox: BTreeMap<VertexId, Vec<FlowMessage>>,
}

impl<'a> ComputeContext<'a> {
    /// Create a new compute context
    pub fn new(superstep: usize, delta: &'a AugmentationMap) -> Self {
        Self {
            superstep,
            delta,
            outbox: BTreeMap::new(),
        }
    }

    /// Send a message to a vertex key
    ///
    /// Messages are grouped by key and handed to the reducer of this round.
    pub fn send_message(&mut self, target: impl Into<VertexId>, message: FlowMessage) {
        let target = target.into();
        self.outbox.entry(target).or_default().push(message);
    }

    /// Consume the context and return the outbox
    pub fn into_outbox(self) -> BTreeMap<VertexId, Vec<FlowMessage>> {
        self.outbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Edge;

    #[test]
    fn test_vertex_id_reserved() {
        assert!(VertexId::source().is_source());
        assert!(VertexId::sink().is_sink());
        assert!(!VertexId::new("a").is_source());
        assert!(VertexId::new("A_p").is_reserved_key());
        assert_eq!(format!("{}", VertexId::new("a")), "a");
    }

    #[test]
    fn test_record_edges_mut_covers_paths() {
        let sa = Edge::new("s", "a", 10);
        let at = Edge::new("a", "t", 5);
        let mut record = VertexRecord {
            source_paths: vec![Path::single(sa)],
            sink_paths: vec![Path::single(at.clone())],
            edges: vec![at],
        };

        assert_eq!(record.edges_mut().count(), 3);
        for edge in record.edges_mut() {
            edge.flow = 1;
        }
        assert!(record.source_paths[0].edges().iter().all(|e| e.flow == 1));
        assert!(record.sink_paths[0].edges().iter().all(|e| e.flow == 1));
    }

    #[test]
    fn test_compute_context_send_message() {
        let delta = AugmentationMap::new();
        let mut ctx = ComputeContext::new(0, &delta);

        let path = Path::single(Edge::new("a", "b", 3));
        ctx.send_message("b", FlowMessage::SourceExcess(path.clone()));
        ctx.send_message("b", FlowMessage::SourceExcess(path));
        ctx.send_message("a", FlowMessage::State(VertexRecord::default()));

        let outbox = ctx.into_outbox();
        assert_eq!(outbox.get(&VertexId::new("b")).unwrap().len(), 2);
        assert_eq!(outbox.get(&VertexId::new("a")).unwrap().len(), 1);
    }
}
