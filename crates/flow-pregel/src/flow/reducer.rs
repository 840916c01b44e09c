//! Reducer program (merge/filter phase)
//!
//! Sees every message addressed to one key in a single batch and rebuilds
//! that key's record for the next round. Three accumulators live for the
//! duration of one invocation:
//!
//! - s-t: at the sink, admits full paths into the round's augmentation map
//! - source filter: admits source-excess paths, at most `max_paths` kept
//! - sink filter: admits sink-excess paths, at most `max_paths` kept

use super::accumulator::{admit, Accumulator};
use super::edge::Path;
use crate::pregel::{AugmentationMap, CandidateOrder, FlowMessage, VertexId, VertexRecord};

/// Result of reducing one key
#[derive(Debug, Clone, Default)]
pub struct ReduceOutput {
    /// Record for the key in the next round
    pub record: VertexRecord,
    /// The round's accepted flow (only produced at the sink)
    pub accepted: Option<AugmentationMap>,
    /// Full paths admitted at the sink
    pub accepted_paths: usize,
    /// Source-excess paths kept in `record`
    pub kept_source_paths: usize,
}

/// Per-key merge of the messages emitted in one round
#[derive(Debug, Clone)]
pub struct ReducerProgram {
    key: VertexId,
    max_paths: usize,
    order: CandidateOrder,
}

impl ReducerProgram {
    /// Create a reducer for `key`
    pub fn new(key: VertexId, max_paths: usize, order: CandidateOrder) -> Self {
        Self {
            key,
            max_paths: max_paths.max(1),
            order,
        }
    }

    /// Key this reducer is responsible for
    pub fn key(&self) -> &VertexId {
        &self.key
    }

    /// Merge all messages for the key
    pub fn reduce(&self, messages: Vec<FlowMessage>) -> ReduceOutput {
        let mut edges = Vec::new();
        let mut source_side = Vec::new();
        let mut sink_side = Vec::new();

        for message in messages {
            match message {
                FlowMessage::Candidate(path) | FlowMessage::SourceExcess(path) => {
                    source_side.push(path)
                }
                FlowMessage::State(record) => {
                    if !record.edges.is_empty() {
                        edges = record.edges;
                    }
                    source_side.extend(record.source_paths);
                    sink_side.extend(record.sink_paths);
                }
            }
        }

        if self.order == CandidateOrder::Signature {
            source_side.sort_by_cached_key(Path::signature);
            sink_side.sort_by_cached_key(Path::signature);
        }

        let mut output = ReduceOutput::default();

        if self.key.is_sink() {
            let arriving = source_side
                .iter()
                .filter(|path| path.terminus() == Some(&self.key));
            let (accepted, accumulator) = admit(arriving, Accumulator::new());
            output.accepted_paths = accepted.len();
            output.accepted = Some(accumulator.into_augmentation());
        } else {
            output.record.source_paths = self.keep_capped(source_side);
        }

        output.record.sink_paths = self.keep_capped(sink_side);
        output.record.edges = edges;
        output.kept_source_paths = output.record.source_paths.len();
        output
    }

    /// Admit paths in order until `max_paths` are kept
    fn keep_capped(&self, paths: Vec<Path>) -> Vec<Path> {
        let mut filter = Accumulator::new();
        let mut kept = Vec::new();
        for path in paths {
            if kept.len() >= self.max_paths {
                break;
            }
            if filter.accept(&path) {
                kept.push(path);
            }
        }
        kept
    }
}
