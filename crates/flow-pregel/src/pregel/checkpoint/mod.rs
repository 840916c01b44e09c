//! Checkpointing for the superstep runtime
//!
//! A checkpoint is taken at a round boundary and holds everything the
//! orchestrator needs to continue: the record set for the next round (with
//! its pending delta), the cumulative augmentation map, the convergence
//! countdown and the round history.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               Checkpointer               │
//! │     ┌──────────┐        ┌──────────┐     │
//! │     │  Memory  │        │   File   │     │
//! │     └──────────┘        └──────────┘     │
//! │           └──────────┬───────┘           │
//! │                      ▼                   │
//! │                 Checkpoint               │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use flow_pregel::pregel::checkpoint::{create_checkpointer, CheckpointerConfig};
//!
//! let config = CheckpointerConfig::File {
//!     path: PathBuf::from("./checkpoints"),
//!     compression: true,
//! };
//! let checkpointer = create_checkpointer(config, "run-123")?;
//!
//! if let Some(checkpoint) = checkpointer.latest().await? {
//!     // continue from checkpoint.superstep
//! }
//! ```

mod file;

pub use file::FileCheckpointer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::PregelError;
use super::runtime::RoundSummary;
use super::state::{AugmentationMap, ConvergenceState, RoundInput};

/// Orchestrator state at a round boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Run this checkpoint belongs to
    pub run_id: String,

    /// Number of completed rounds
    pub superstep: usize,

    /// Records and pending delta for the next round
    pub input: RoundInput,

    /// Cumulative accepted flow
    pub augmentation: AugmentationMap,

    /// Convergence countdown after the last completed round
    pub convergence: ConvergenceState,

    /// Per-round summaries so far
    #[serde(default)]
    pub history: Vec<RoundSummary>,

    /// When this checkpoint was created
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a new checkpoint
    pub fn new(
        run_id: impl Into<String>,
        superstep: usize,
        input: RoundInput,
        augmentation: AugmentationMap,
        convergence: ConvergenceState,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            superstep,
            input,
            augmentation,
            convergence,
            history: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the round history
    pub fn with_history(mut self, history: Vec<RoundSummary>) -> Self {
        self.history = history;
        self
    }

    /// Check if the checkpoint holds no records
    pub fn is_empty(&self) -> bool {
        self.input.records.is_empty()
    }
}

/// Durable storage for checkpoints
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Save a checkpoint.
    ///
    /// Implementations should ensure atomic writes to prevent corruption.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PregelError>;

    /// Load a checkpoint by superstep number.
    async fn load(&self, superstep: usize) -> Result<Option<Checkpoint>, PregelError>;

    /// Load the latest checkpoint.
    async fn latest(&self) -> Result<Option<Checkpoint>, PregelError>;

    /// List all available checkpoint superstep numbers, sorted ascending.
    async fn list(&self) -> Result<Vec<usize>, PregelError>;

    /// Delete a specific checkpoint.
    async fn delete(&self, superstep: usize) -> Result<(), PregelError>;

    /// Keep only the most recent `keep` checkpoints.
    async fn prune(&self, keep: usize) -> Result<usize, PregelError> {
        let checkpoints = self.list().await?;
        let to_delete = checkpoints.len().saturating_sub(keep);
        let mut deleted = 0;

        for superstep in checkpoints.into_iter().take(to_delete) {
            self.delete(superstep).await?;
            deleted += 1;
        }

        Ok(deleted)
    }
}

/// Configuration for creating checkpointers
#[derive(Debug, Clone)]
pub enum CheckpointerConfig {
    /// File-based checkpointing
    File {
        /// Directory to store checkpoint files
        path: PathBuf,
        /// Whether to compress checkpoint data (uses zstd)
        compression: bool,
    },
}

/// In-memory checkpointer
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    checkpoints: tokio::sync::RwLock<HashMap<usize, Checkpoint>>,
}

impl MemoryCheckpointer {
    /// Create a new in-memory checkpointer
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PregelError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.insert(checkpoint.superstep, checkpoint.clone());
        Ok(())
    }

    async fn load(&self, superstep: usize) -> Result<Option<Checkpoint>, PregelError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(&superstep).cloned())
    }

    async fn latest(&self) -> Result<Option<Checkpoint>, PregelError> {
        let checkpoints = self.checkpoints.read().await;
        let max_superstep = checkpoints.keys().max().copied();
        Ok(max_superstep.and_then(|superstep| checkpoints.get(&superstep).cloned()))
    }

    async fn list(&self) -> Result<Vec<usize>, PregelError> {
        let checkpoints = self.checkpoints.read().await;
        let mut supersteps: Vec<usize> = checkpoints.keys().copied().collect();
        supersteps.sort();
        Ok(supersteps)
    }

    async fn delete(&self, superstep: usize) -> Result<(), PregelError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.remove(&superstep);
        Ok(())
    }
}

/// Create a checkpointer from configuration
pub fn create_checkpointer(
    config: CheckpointerConfig,
    run_id: impl Into<String>,
) -> Result<Arc<dyn Checkpointer>, PregelError> {
    let run_id: String = run_id.into();
    match config {
        CheckpointerConfig::File { path, compression } => {
            Ok(Arc::new(FileCheckpointer::new(path, run_id, compression)))
        }
    }
}
