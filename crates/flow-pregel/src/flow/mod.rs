//! Augmenting-path search programs
//!
//! The per-vertex logic of one round, independent of how rounds are driven:
//!
//! ```text
//!   record ──► VertexProgram ──► (key, FlowMessage)* ──► shuffle ──► ReducerProgram ──► record'
//!                   │                                                     │
//!                   └── Accumulator (combine)        Accumulator ×3 ─────┘
//! ```
//!
//! Every edge copy inside a path carries the flow known as of the previous
//! round. Admission is checked against that flow plus whatever the current
//! invocation already admitted, so a round never commits more than an edge's
//! capacity.

pub mod accumulator;
pub mod edge;
pub mod mapper;
pub mod reducer;

pub use accumulator::{admit, Accumulator};
pub use edge::{Edge, EdgeId, Path};
pub use mapper::{MapStats, VertexProgram};
pub use reducer::{ReduceOutput, ReducerProgram};
