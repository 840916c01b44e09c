//! Pregel runtime configuration
//!
//! Configuration for the superstep engine including parallelism,
//! termination heuristics, fan-out caps, checkpointing and timeouts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of consecutive unchanged rounds before convergence
pub const DEFAULT_CONVERGENCE_WINDOW: usize = 5;

/// Default cap on source/sink paths kept per vertex per round
pub const MAX_PATHS: usize = 10;

/// Order in which a reducer evaluates the candidates addressed to its key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateOrder {
    /// Messages in arrival order, paths in emission order
    #[default]
    Arrival,

    /// All candidates sorted by path signature before admission.
    /// Gives repeatable accepted-path sets across runtimes and partitionings.
    Signature,
}

/// Pregel runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PregelConfig {
    /// Maximum supersteps before forced termination
    pub max_supersteps: usize,

    /// Maximum concurrent vertex computations
    pub parallelism: usize,

    /// Checkpoint frequency (every N supersteps, 0 = disabled)
    pub checkpoint_interval: usize,

    /// Most recent checkpoints kept after each save (0 = keep all)
    #[serde(default)]
    pub keep_checkpoints: usize,

    /// Timeout for the entire run, checked between rounds
    #[serde(with = "humantime_serde")]
    pub workflow_timeout: Duration,

    /// Unchanged rounds required before the run is considered converged
    pub convergence_window: usize,

    /// Cap on source/sink paths kept per vertex per round
    pub max_paths: usize,

    /// Candidate evaluation order in reducers
    pub candidate_order: CandidateOrder,

    /// Enable per-round tracing events
    pub tracing_enabled: bool,
}

impl Default for PregelConfig {
    fn default() -> Self {
        Self {
            max_supersteps: 1000,
            parallelism: num_cpus::get(),
            checkpoint_interval: 10,
            keep_checkpoints: 0,
            workflow_timeout: Duration::from_secs(3600), // 1 hour total
            convergence_window: DEFAULT_CONVERGENCE_WINDOW,
            max_paths: MAX_PATHS,
            candidate_order: CandidateOrder::default(),
            tracing_enabled: true,
        }
    }
}

impl PregelConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum supersteps
    pub fn with_max_supersteps(mut self, max: usize) -> Self {
        self.max_supersteps = max;
        self
    }

    /// Set parallelism level
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Set checkpoint interval (0 to disable)
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Keep only the newest `keep` checkpoints (0 to keep all)
    pub fn with_keep_checkpoints(mut self, keep: usize) -> Self {
        self.keep_checkpoints = keep;
        self
    }

    /// Set run timeout
    pub fn with_workflow_timeout(mut self, timeout: Duration) -> Self {
        self.workflow_timeout = timeout;
        self
    }

    /// Set the convergence window (at least 1)
    pub fn with_convergence_window(mut self, window: usize) -> Self {
        self.convergence_window = window.max(1);
        self
    }

    /// Set the per-vertex path cap (at least 1)
    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths.max(1);
        self
    }

    /// Set the reducer candidate order
    pub fn with_candidate_order(mut self, order: CandidateOrder) -> Self {
        self.candidate_order = order;
        self
    }

    /// Enable or disable tracing
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }

    /// Check if checkpointing is enabled
    pub fn checkpointing_enabled(&self) -> bool {
        self.checkpoint_interval > 0
    }

    /// Check if a checkpoint should be taken at this superstep
    #[allow(clippy::manual_is_multiple_of)] // Using % for compatibility with older Rust versions
    pub fn should_checkpoint(&self, superstep: usize) -> bool {
        self.checkpointing_enabled() && superstep > 0 && superstep % self.checkpoint_interval == 0
    }
}
