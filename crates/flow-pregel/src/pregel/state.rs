//! Round state owned by the orchestrator
//!
//! - [`AugmentationMap`]: accepted flow per edge id. The same type carries one
//!   round's delta (`A_p`) and the cumulative global map.
//! - [`ConvergenceState`]: the countdown used to detect that no progress has
//!   been observed for a number of consecutive rounds.
//! - [`RoundInput`]: the record set handed from one round to the next.
//!
//! All of these are updated only between rounds, never during one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::vertex::{VertexId, VertexRecord};
use crate::flow::EdgeId;

/// Accepted flow per edge id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AugmentationMap(BTreeMap<EdgeId, i64>);

impl AugmentationMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Flow recorded for an edge (0 when absent)
    pub fn get(&self, id: &EdgeId) -> i64 {
        self.0.get(id).copied().unwrap_or(0)
    }

    /// Check whether the edge has an entry at all
    pub fn contains(&self, id: &EdgeId) -> bool {
        self.0.contains_key(id)
    }

    /// Add flow to an edge
    pub fn add(&mut self, id: EdgeId, amount: i64) {
        *self.0.entry(id).or_insert(0) += amount;
    }

    /// Number of edges with an entry
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in edge id order
    pub fn iter(&self) -> impl Iterator<Item = (&EdgeId, i64)> {
        self.0.iter().map(|(id, flow)| (id, *flow))
    }

    /// Apply a round delta to produce a new map
    ///
    /// This is a pure function - the original map is not modified.
    pub fn apply(&self, delta: &AugmentationMap) -> Self {
        let mut next = self.clone();
        for (id, amount) in delta.iter() {
            next.add(id.clone(), amount);
        }
        next
    }

    /// Total flow on edges ending at `vertex` minus flow on edges leaving it
    ///
    /// For the sink this is the value of the accepted flow.
    pub fn net_flow_into(&self, vertex: &VertexId) -> i64 {
        self.iter()
            .filter_map(|(id, flow)| {
                let (from, to) = id.endpoints()?;
                if to == vertex.as_str() {
                    Some(flow)
                } else if from == vertex.as_str() {
                    Some(-flow)
                } else {
                    None
                }
            })
            .sum()
    }
}

impl FromIterator<(EdgeId, i64)> for AugmentationMap {
    fn from_iter<I: IntoIterator<Item = (EdgeId, i64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (id, amount) in iter {
            map.add(id, amount);
        }
        map
    }
}

/// Phase of the convergence state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergencePhase {
    /// More rounds are needed
    Running,
    /// No change observed for a full window of rounds
    Converged,
}

/// Countdown over the per-round kept source-path count
///
/// The count changing resets the countdown to the window; an unchanged count
/// decrements it. Reaching zero means the count stayed the same for `window`
/// consecutive rounds. This is a heuristic, not a proof of a fixed point: a
/// larger window lowers the risk of stopping while useful paths are still
/// propagating, at the cost of extra rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceState {
    window: usize,
    countdown: usize,
    /// `None` until the first observation
    last_source_paths: Option<usize>,
}

impl ConvergenceState {
    /// Create a new state with the given window (at least 1)
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            countdown: window,
            last_source_paths: None,
        }
    }

    /// Record one round's kept source-path count
    pub fn observe(&mut self, source_paths: usize) -> ConvergencePhase {
        if self.last_source_paths == Some(source_paths) {
            self.countdown = self.countdown.saturating_sub(1);
        } else {
            self.countdown = self.window;
        }
        self.last_source_paths = Some(source_paths);
        self.phase()
    }

    /// Current phase
    pub fn phase(&self) -> ConvergencePhase {
        if self.countdown == 0 {
            ConvergencePhase::Converged
        } else {
            ConvergencePhase::Running
        }
    }

    /// Check if the countdown reached zero
    pub fn is_converged(&self) -> bool {
        self.phase() == ConvergencePhase::Converged
    }

    /// Remaining unchanged rounds before convergence
    pub fn countdown(&self) -> usize {
        self.countdown
    }

    /// Configured window
    pub fn window(&self) -> usize {
        self.window
    }

    /// Count observed in the last round
    pub fn last_source_paths(&self) -> Option<usize> {
        self.last_source_paths
    }
}

impl Default for ConvergenceState {
    fn default() -> Self {
        Self::new(5)
    }
}

/// The record set for one round plus the deltas accepted in the round before it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInput {
    /// Records keyed by vertex id
    pub records: BTreeMap<VertexId, VertexRecord>,
    /// Deltas each vertex applies before computing
    pub delta: AugmentationMap,
}

impl RoundInput {
    /// Create a round input with no pending deltas
    pub fn new(records: BTreeMap<VertexId, VertexRecord>) -> Self {
        Self {
            records,
            delta: AugmentationMap::new(),
        }
    }

    /// Check if a vertex has a record
    pub fn contains(&self, id: &VertexId) -> bool {
        self.records.contains_key(id)
    }

    /// Number of vertex records
    pub fn vertex_count(&self) -> usize {
        self.records.len()
    }
}
