//! Pregel Runtime for the superstep max-flow search
//!
//! This module implements the bulk-synchronous engine that drives the
//! augmenting-path programs in [`crate::flow`]. Key concepts:
//!
//! - **Vertex**: owns a record of source paths, sink paths and outgoing edges
//! - **Superstep**: one map phase over every vertex plus one reduce phase per key
//! - **Message**: a path or a refreshed record addressed to a vertex key
//! - **Augmentation map**: accepted flow per edge, produced at the sink each round
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PregelRuntime                         │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐                       │
//! │  │Superstep│→ │Superstep│→ │Superstep│→ ... countdown = 0    │
//! │  │    0    │  │    1    │  │    2    │                       │
//! │  └─────────┘  └─────────┘  └─────────┘                       │
//! │       │            │            │                            │
//! │       ▼            ▼            ▼                            │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Per-Superstep: Read → Map → Shuffle → Reduce → Write   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │       │                                        │             │
//! │       ▼                                        ▼             │
//! │   VertexStore                            Checkpointer        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Termination
//!
//! The total number of kept source-excess paths is observed after every
//! round. A change resets the countdown to `convergence_window`; an unchanged
//! count decrements it. The run converges when it reaches zero.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod message;
pub mod runtime;
pub mod state;
pub mod store;
pub mod vertex;

// Re-exports
pub use checkpoint::{
    create_checkpointer, Checkpoint, Checkpointer, CheckpointerConfig, FileCheckpointer,
    MemoryCheckpointer,
};
pub use config::{CandidateOrder, PregelConfig, DEFAULT_CONVERGENCE_WINDOW, MAX_PATHS};
pub use error::PregelError;
pub use message::FlowMessage;
pub use runtime::{AbortHandle, FlowResult, PregelRuntime, RoundSummary};
pub use state::{AugmentationMap, ConvergencePhase, ConvergenceState, RoundInput};
pub use store::{LineFileStore, MemoryStore, VertexStore};
pub use vertex::{ComputeContext, VertexId, VertexRecord, AUGMENTATION_KEY, SINK, SOURCE};
