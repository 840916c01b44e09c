//! Error types for the superstep runtime
//!
//! Only `MalformedRecord` is locally recoverable (the record is skipped);
//! every other variant terminates the run with a diagnostic.

use super::state::AugmentationMap;
use super::vertex::VertexId;
use crate::flow::EdgeId;
use thiserror::Error;

/// Errors that can occur while materializing, running or extracting a flow
#[derive(Debug, Error)]
pub enum PregelError {
    /// Maximum supersteps exceeded before convergence
    #[error("Max supersteps exceeded: {0}")]
    MaxSuperstepsExceeded(usize),

    /// The graph lacks the source or the sink vertex
    #[error("Missing endpoint: graph has no vertex {0:?}")]
    MissingEndpoint(VertexId),

    /// A record line could not be parsed
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// Accepted flow exceeds an edge's capacity
    #[error("Capacity violation on edge {edge}: flow {flow} exceeds capacity {capacity}")]
    CapacityViolation {
        edge: EdgeId,
        flow: i64,
        capacity: i64,
    },

    /// Error during vertex computation
    #[error("Vertex error in {vertex_id:?}: {message}")]
    VertexError {
        vertex_id: VertexId,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error in round state management
    #[error("State error: {0}")]
    StateError(String),

    /// Error in the round hand-off store
    #[error("Store error: {0}")]
    StoreError(String),

    /// Error in checkpointing
    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    /// Invalid runtime or graph configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Run aborted between rounds; the partial map is not a maximum flow
    #[error("Run aborted after superstep {superstep}")]
    Aborted {
        superstep: usize,
        partial: Box<AugmentationMap>,
    },

    /// Run exceeded its time budget
    #[error("Workflow timeout after {0:?}")]
    WorkflowTimeout(std::time::Duration),

    /// Checkpoint run_id mismatch
    #[error("Checkpoint run mismatch: expected {expected}, found {found}")]
    CheckpointMismatch { expected: String, found: String },
}

impl PregelError {
    /// Create a vertex error with source
    pub fn vertex_error_with_source(
        vertex_id: impl Into<VertexId>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::VertexError {
            vertex_id: vertex_id.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a malformed record error
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Create a missing endpoint error
    pub fn missing_endpoint(vertex_id: impl Into<VertexId>) -> Self {
        Self::MissingEndpoint(vertex_id.into())
    }

    /// Create a capacity violation error
    pub fn capacity_violation(edge: EdgeId, flow: i64, capacity: i64) -> Self {
        Self::CapacityViolation {
            edge,
            flow,
            capacity,
        }
    }

    /// Check if the error is recoverable (skip and continue)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PregelError::MalformedRecord { .. })
    }

    /// Partial accepted flow carried by an aborted run
    pub fn partial_augmentation(&self) -> Option<&AugmentationMap> {
        match self {
            PregelError::Aborted { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Create a state error
    pub fn state_error(message: impl Into<String>) -> Self {
        Self::StateError(message.into())
    }

    /// Create a store error
    pub fn store_error(message: impl Into<String>) -> Self {
        Self::StoreError(message.into())
    }

    /// Create a checkpoint error
    pub fn checkpoint_error(message: impl Into<String>) -> Self {
        Self::CheckpointError(message.into())
    }

    /// Create a config error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a checkpoint mismatch error
    pub fn checkpoint_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::CheckpointMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
