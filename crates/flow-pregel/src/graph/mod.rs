//! Graph collaborators around the superstep engine
//!
//! Nothing in [`crate::flow`] or [`crate::pregel`] depends on this module.
//! It turns an adjacency-list file into the first round's records, reads the
//! cut back out of a finished augmentation map, and generates random test
//! networks.
//!
//! ```text
//! graph file ──parse──▶ FlowNetwork ──materialize──▶ RoundInput ──▶ PregelRuntime
//!                            │                                           │
//!                            └──────────── min_cut ◀── AugmentationMap ◀─┘
//! ```

pub mod extract;
pub mod generate;
pub mod network;

pub use extract::{min_cut, residual_graph, MinCut, ResidualGraph};
pub use generate::{small_world, GeneratorConfig};
pub use network::FlowNetwork;
