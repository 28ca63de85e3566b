//! Trellis Core
//!
//! This crate provides the incremental evaluation core for node-graph
//! editors. It implements:
//!
//! - Link diffing: which nodes a batch of link edits affects
//! - Nested data trees carried by sockets
//! - Broadcast evaluation of per-value transfer functions over those trees
//! - Execution passes in topological order
//!
//! The engine does not own the node graph. Hosts expose theirs through the
//! traits in [`host`].
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: ids, link records, the link-set differ and the scheduler
//! - `data`: data trees, the per-pass socket table and broadcasting
//! - `runtime`: transfer functions and the graph runner
//! - `host`: host graph contracts and an in-memory host
//! - `engine`: the facade tying a differ to a runner
//!
//! # Example
//!
//! ```rust
//! use trellis_core::data::Value;
//! use trellis_core::host::MemoryTree;
//! use trellis_core::runtime::from_fn;
//! use trellis_core::{Engine, LinkSource};
//!
//! let engine = Engine::<Value>::default();
//! let mut tree = MemoryTree::<Value>::new();
//!
//! let numbers = tree.add_node_with("numbers", 0, 1, from_fn(|_: Vec<Value>| {
//!     Ok(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
//! }));
//! let viewer = tree.add_node("viewer", 1, 0);
//! tree.link(tree.output(numbers, 0), tree.input(viewer, 0));
//!
//! engine.update(&mut tree).unwrap();
//! assert_eq!(
//!     engine.socket_info(tree.tree_id(), tree.output(numbers, 0)).as_deref(),
//!     Some("3")
//! );
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod graph;
pub mod host;
pub mod runtime;

pub use config::EngineConfig;
pub use data::{BroadcastStrategy, DataTree, Payload, Value};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use graph::{LinkRecord, LinkSetDiffer, NodeId, SocketId, TreeId};
pub use host::{HostGraph, LinkSource, MemoryTree};
pub use runtime::{NodeProcessor, PassReport};
