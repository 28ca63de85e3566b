//! Execution Runtime
//!
//! Node behavior and the pass that drives it.
//!
//! # Overview
//!
//! - [`NodeProcessor`]: the transfer function a host attaches to a node.
//! - [`GraphRunner`]: executes nodes in topological order, wiring each
//!   node's inputs to the trees its producers stored earlier in the pass.

mod processor;
mod runner;

pub use processor::{
    from_fn, from_list_fn, FnProcessor, ListFnProcessor, NodeProcessor, Unsupported,
};
pub use runner::{GraphRunner, NodeStats, PassReport};
