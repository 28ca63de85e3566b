//! Host Contracts
//!
//! The engine never owns the node graph. A host (an editor, a test fixture,
//! a headless loader) exposes its graph through these traits:
//!
//! - [`LinkSource`] is all the dependency tracker needs: links, node
//!   existence, reroute flags and socket ownership.
//! - [`HostGraph`] adds per-node sockets, node types and the transfer
//!   functions, which is what an execution pass needs.
//!
//! [`MemoryTree`] is a small in-memory host used by the tests, the
//! benchmarks and anyone embedding the engine without an editor.

mod memory;

pub use memory::MemoryTree;

use indexmap::IndexSet;

use crate::data::Payload;
use crate::graph::{scheduler, LinkRecord, NodeId, NodeTypeId, RawLink, SocketId, TreeId};
use crate::runtime::NodeProcessor;

/// Read-only view of a host graph's topology.
pub trait LinkSource {
    /// The tree this graph belongs to.
    fn tree_id(&self) -> TreeId;

    /// Every live link, reroutes included.
    fn links(&self) -> Vec<RawLink>;

    /// Every live node, in a stable order.
    fn node_ids(&self) -> Vec<NodeId>;

    fn node_exists(&self, node: NodeId) -> bool;

    /// Whether `node` is a pass-through reroute.
    fn is_reroute(&self, node: NodeId) -> bool;

    /// The node owning `socket`, if the socket exists.
    fn socket_owner(&self, socket: SocketId) -> Option<NodeId>;

    /// Topological order covering at least the downstream closure of `seeds`.
    ///
    /// The default also includes every ancestor feeding that closure, because
    /// a pass starts from an empty socket table.
    fn topo_order(&self, seeds: &IndexSet<NodeId>) -> Vec<NodeId> {
        let links: Vec<LinkRecord> =
            crate::graph::collect_links(self).records.into_iter().collect();
        scheduler::execution_order(&self.node_ids(), &links, seeds)
    }
}

/// A host graph that can be executed.
pub trait HostGraph<T: Payload>: LinkSource {
    /// Input sockets of `node`, in declaration order. Empty for unknown nodes.
    fn inputs(&self, node: NodeId) -> &[SocketId];

    /// Output sockets of `node`, in declaration order. Empty for unknown nodes.
    fn outputs(&self, node: NodeId) -> &[SocketId];

    /// The type of `node`, used for strategy lookup.
    fn node_type(&self, node: NodeId) -> Option<&NodeTypeId>;

    /// The transfer function of `node`. Reroutes and frames have none.
    fn processor(&mut self, node: NodeId) -> Option<&mut dyn NodeProcessor<T>>;
}
