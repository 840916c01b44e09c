//! Message types exchanged between the map and reduce phases
//!
//! Every message is addressed to a vertex key. The reducer for that key sees
//! all messages addressed to it in one batch.

use serde::{Deserialize, Serialize};

use super::vertex::VertexRecord;
use crate::flow::Path;

/// A message emitted by a vertex program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMessage {
    /// Full `s -> t` candidate built by joining a source and a sink path
    Candidate(Path),

    /// Source-excess path (seeded at `s` or extended by one edge)
    SourceExcess(Path),

    /// The sender's own refreshed record, addressed to itself
    State(VertexRecord),
}

impl FlowMessage {
    /// Source-side paths carried by this message, in emission order
    pub fn source_paths(&self) -> &[Path] {
        match self {
            FlowMessage::Candidate(path) | FlowMessage::SourceExcess(path) => {
                std::slice::from_ref(path)
            }
            FlowMessage::State(record) => &record.source_paths,
        }
    }

    /// Check if this is a full candidate
    pub fn is_candidate(&self) -> bool {
        matches!(self, FlowMessage::Candidate(_))
    }
}
