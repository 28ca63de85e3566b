//! Dependency Tracking
//!
//! This module tracks the link topology of node trees between edits and
//! decides which nodes an edit affects.
//!
//! # Overview
//!
//! A node tree is a directed graph where:
//!
//! - Nodes own ordered input and output sockets
//! - Links connect one output socket to one input socket
//!
//! After every edit the host asks the [`LinkSetDiffer`] which nodes were
//! affected. The differ rebuilds the tree's [`LinkRecord`] set, compares it
//! to the set committed on the previous call and reports the nodes whose
//! inputs changed meaning. The scheduler then expands that seed set into an
//! execution order.
//!
//! # Design Decisions
//!
//! 1. Link records carry ids, never names, so renames are not edits.
//!
//! 2. Reroute nodes are removed while collecting links; they never appear in
//!    a record and never become affected.
//!
//! 3. Snapshots are explicit per-tree values held in a registry keyed by
//!    [`TreeId`], created on first use and replaced on every diff.

mod differ;
mod ids;
mod link;
pub mod scheduler;
mod snapshot;

pub use differ::{DiffReport, LinkSetDiffer};
pub use ids::{NodeId, NodeTypeId, SocketId, TreeId};
pub use link::{collect_links, LinkRecord, NormalizedLinks, RawLink};
pub use scheduler::DependencyIndex;
pub use snapshot::{CommittedLinks, LinkSnapshot};
