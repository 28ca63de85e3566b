//! Socket Data
//!
//! This module implements the data side of the engine: the nested trees
//! carried by sockets, the per-tree table holding them during a pass, and
//! the broadcast evaluator that maps transfer functions over them.
//!
//! # Concepts
//!
//! ## Data Trees
//!
//! A socket carries a [`DataTree`]: a leaf value or an ordered branch of
//! subtrees. One socket may hold a single matrix while its neighbor holds
//! fifty; nothing forces sibling inputs to share a depth.
//!
//! ## Broadcasting
//!
//! Transfer functions are written for single values (or single lists). The
//! [`BroadcastEvaluator`] walks all inputs in lockstep, repeating the last
//! element of shorter lists, and calls the function once per combination.
//!
//! ## Strategies
//!
//! The node type decides where that walk stops and how results are stored,
//! see [`BroadcastStrategy`].

mod broadcast;
mod payload;
mod store;
mod strategy;
mod tree;

pub use broadcast::{zip_broadcast, BroadcastEvaluator, Row};
pub use payload::{Payload, Value};
pub use store::DataStore;
pub use strategy::{BroadcastStrategy, StrategyTable};
pub use tree::DataTree;
