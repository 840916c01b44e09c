//! Vertex program (map phase)
//!
//! Runs once per vertex per round over an owned copy of the vertex's record:
//! apply deltas, prune, combine, seed, extend, self-emit. The only output is
//! the outbox of the [`ComputeContext`].

use std::collections::BTreeSet;

use super::accumulator::Accumulator;
use super::edge::{EdgeId, Path};
use crate::pregel::{ComputeContext, FlowMessage, VertexId, VertexRecord};

/// Counters describing one vertex program invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    /// Edges that became saturated when the deltas were applied
    pub saturated: usize,
    /// Stored paths dropped because they crossed a saturated edge
    pub pruned: usize,
    /// Full candidates sent to the sink
    pub candidates: usize,
    /// Extended source paths sent to neighbours (seeds included)
    pub extensions: usize,
}

/// Per-vertex computation for one round
pub struct VertexProgram {
    id: VertexId,
    record: VertexRecord,
}

impl VertexProgram {
    /// Create the program for a vertex over its record
    pub fn new(id: VertexId, record: VertexRecord) -> Self {
        Self { id, record }
    }

    /// Run the program, emitting into `ctx`
    pub fn compute(mut self, ctx: &mut ComputeContext<'_>) -> MapStats {
        let mut stats = MapStats::default();

        let saturated = self.apply_deltas(ctx);
        stats.saturated = saturated.len();
        stats.pruned = self.prune(&saturated);
        stats.candidates = self.combine(ctx);

        if self.id.is_source() {
            stats.extensions += self.seed(ctx);
        }
        if !self.id.is_sink() {
            stats.extensions += self.extend(ctx);
        }

        tracing::trace!(
            vertex = %self.id,
            superstep = ctx.superstep,
            candidates = stats.candidates,
            extensions = stats.extensions,
            "Vertex mapped"
        );
        let id = self.id.clone();
        ctx.send_message(id, FlowMessage::State(self.record));
        stats
    }

    /// Add the previous round's deltas to every edge copy the record holds
    fn apply_deltas(&mut self, ctx: &ComputeContext<'_>) -> BTreeSet<EdgeId> {
        let mut saturated = BTreeSet::new();
        if ctx.delta.is_empty() {
            return saturated;
        }
        for edge in self.record.edges_mut() {
            if edge.apply_delta(ctx.delta) {
                saturated.insert(edge.id.clone());
            }
        }
        saturated
    }

    /// Drop stored paths that cross a saturated edge
    fn prune(&mut self, saturated: &BTreeSet<EdgeId>) -> usize {
        if saturated.is_empty() {
            return 0;
        }
        let before = self.record.source_paths.len() + self.record.sink_paths.len();
        self.record
            .source_paths
            .retain(|path| !path.contains_any(saturated));
        self.record
            .sink_paths
            .retain(|path| !path.contains_any(saturated));
        before - self.record.source_paths.len() - self.record.sink_paths.len()
    }

    /// Join source and sink paths held here into full candidates for the sink
    fn combine(&self, ctx: &mut ComputeContext<'_>) -> usize {
        let mut accumulator = Accumulator::new();
        let mut emitted = 0;
        for source_path in &self.record.source_paths {
            for sink_path in &self.record.sink_paths {
                let Some(candidate) = source_path.join(sink_path) else {
                    continue;
                };
                if accumulator.accept(&candidate) {
                    ctx.send_message(VertexId::sink(), FlowMessage::Candidate(candidate));
                    emitted += 1;
                }
            }
        }
        emitted
    }

    /// Re-seed a one-edge source path along every outgoing edge of `s`
    fn seed(&self, ctx: &mut ComputeContext<'_>) -> usize {
        for edge in &self.record.edges {
            ctx.send_message(
                edge.destination.clone(),
                FlowMessage::SourceExcess(Path::single(edge.clone())),
            );
        }
        self.record.edges.len()
    }

    /// Extend every held source path along every usable outgoing edge
    fn extend(&self, ctx: &mut ComputeContext<'_>) -> usize {
        if self.record.source_paths.is_empty() {
            return 0;
        }
        let mut emitted = 0;
        for edge in self.record.edges.iter().filter(|e| !e.is_saturated()) {
            for source_path in &self.record.source_paths {
                if source_path.would_cycle(edge) {
                    continue;
                }
                ctx.send_message(
                    edge.destination.clone(),
                    FlowMessage::SourceExcess(source_path.extended(edge.clone())),
                );
                emitted += 1;
            }
        }
        emitted
    }
}
