//! flow-pregel: superstep-synchronized augmenting-path max-flow
//!
//! Computes maximum flow (and the matching minimum cut) on a directed,
//! capacitated graph with a Pregel-style engine:
//! - `flow`: Edge/Path model, the `Accumulator` admission structure,
//!   and the per-vertex mapper / per-key reducer programs
//! - `pregel`: the superstep runtime (rounds, shuffle, convergence),
//!   configuration, errors, round hand-off stores and checkpoints
//! - `graph`: adjacency-list materialization, residual-graph min-cut
//!   extraction and random test-graph generation
//!
//! # Example
//!
//! ```rust,ignore
//! use flow_pregel::graph::{min_cut, FlowNetwork};
//! use flow_pregel::pregel::{MemoryStore, PregelRuntime};
//! use std::sync::Arc;
//!
//! let network = FlowNetwork::load("graph.txt").await?;
//! let runtime = PregelRuntime::new(Arc::new(MemoryStore::new()));
//! let result = runtime.run(network.materialize()?).await?;
//! let cut = min_cut(&network, &result.augmentation)?;
//! println!("max flow = {}", cut.value);
//! ```

pub mod flow;
pub mod graph;
pub mod pregel;

// Re-exports for convenience
pub use flow::{Accumulator, Edge, EdgeId, Path, ReducerProgram, VertexProgram};
pub use graph::{min_cut, residual_graph, small_world, FlowNetwork, GeneratorConfig, MinCut};
pub use pregel::{
    AugmentationMap, ConvergenceState, FlowResult, PregelConfig, PregelError, PregelRuntime,
    RoundInput, VertexId, VertexRecord,
};
