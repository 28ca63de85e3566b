//! In-memory host graph.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use super::{HostGraph, LinkSource};
use crate::data::Payload;
use crate::graph::{NodeId, NodeTypeId, RawLink, SocketId, TreeId};
use crate::runtime::NodeProcessor;

const REROUTE: &str = "reroute";

struct MemoryNode<T> {
    node_type: NodeTypeId,
    inputs: Vec<SocketId>,
    outputs: Vec<SocketId>,
    reroute: bool,
    processor: Option<Box<dyn NodeProcessor<T>>>,
}

/// A node graph held entirely in memory.
///
/// Ids are allocated sequentially per tree. An input socket accepts one
/// link; linking it again replaces the previous link.
pub struct MemoryTree<T> {
    id: TreeId,
    nodes: IndexMap<NodeId, MemoryNode<T>>,
    owners: HashMap<SocketId, NodeId>,
    links: Vec<RawLink>,
    next_id: u64,
}

impl<T> MemoryTree<T> {
    /// Create an empty tree with a fresh id.
    pub fn new() -> Self {
        Self::with_id(TreeId::new())
    }

    pub fn with_id(id: TreeId) -> Self {
        Self {
            id,
            nodes: IndexMap::new(),
            owners: HashMap::new(),
            links: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert_node(
        &mut self,
        node_type: NodeTypeId,
        inputs: usize,
        outputs: usize,
        reroute: bool,
    ) -> NodeId {
        let node = NodeId::from(self.allocate());
        let inputs: Vec<SocketId> = (0..inputs).map(|_| SocketId::from(self.allocate())).collect();
        let outputs: Vec<SocketId> =
            (0..outputs).map(|_| SocketId::from(self.allocate())).collect();
        for &socket in inputs.iter().chain(&outputs) {
            self.owners.insert(socket, node);
        }
        self.nodes.insert(
            node,
            MemoryNode {
                node_type,
                inputs,
                outputs,
                reroute,
                processor: None,
            },
        );
        node
    }

    /// Add a node without a transfer function.
    pub fn add_node(
        &mut self,
        node_type: impl Into<NodeTypeId>,
        inputs: usize,
        outputs: usize,
    ) -> NodeId {
        self.insert_node(node_type.into(), inputs, outputs, false)
    }

    /// Add a node together with its transfer function.
    pub fn add_node_with(
        &mut self,
        node_type: impl Into<NodeTypeId>,
        inputs: usize,
        outputs: usize,
        processor: impl NodeProcessor<T> + 'static,
    ) -> NodeId {
        let node = self.add_node(node_type, inputs, outputs);
        self.set_processor(node, processor);
        node
    }

    /// Add a reroute: one input, one output, no behavior.
    pub fn add_reroute(&mut self) -> NodeId {
        self.insert_node(NodeTypeId::from(REROUTE), 1, 1, true)
    }

    /// Replace the transfer function of `node`. Returns `false` for unknown nodes.
    pub fn set_processor(
        &mut self,
        node: NodeId,
        processor: impl NodeProcessor<T> + 'static,
    ) -> bool {
        match self.nodes.get_mut(&node) {
            Some(entry) => {
                entry.processor = Some(Box::new(processor));
                true
            }
            None => false,
        }
    }

    /// Input socket `index` of `node`.
    ///
    /// # Panics
    ///
    /// If the node or the socket does not exist.
    pub fn input(&self, node: NodeId, index: usize) -> SocketId {
        self.nodes[&node].inputs[index]
    }

    /// Output socket `index` of `node`.
    ///
    /// # Panics
    ///
    /// If the node or the socket does not exist.
    pub fn output(&self, node: NodeId, index: usize) -> SocketId {
        self.nodes[&node].outputs[index]
    }

    /// Link an output socket to an input socket.
    ///
    /// Returns `false` if either socket is unknown or the sockets are the
    /// wrong way round.
    pub fn link(&mut self, from: SocketId, to: SocketId) -> bool {
        let (Some(&from_node), Some(&to_node)) = (self.owners.get(&from), self.owners.get(&to))
        else {
            return false;
        };
        let valid = self.nodes[&from_node].outputs.contains(&from)
            && self.nodes[&to_node].inputs.contains(&to);
        if !valid {
            return false;
        }

        self.links.retain(|link| link.to_socket != to);
        self.links.push(RawLink {
            from_node,
            from_socket: from,
            to_node,
            to_socket: to,
            is_reroute_destination: self.nodes[&to_node].reroute,
            is_muted: false,
        });
        true
    }

    /// Mute or unmute the link between two sockets. Returns whether it exists.
    pub fn set_muted(&mut self, from: SocketId, to: SocketId, muted: bool) -> bool {
        match self
            .links
            .iter_mut()
            .find(|link| link.from_socket == from && link.to_socket == to)
        {
            Some(link) => {
                link.is_muted = muted;
                true
            }
            None => false,
        }
    }

    /// Remove the link between two sockets. Returns whether it existed.
    pub fn unlink(&mut self, from: SocketId, to: SocketId) -> bool {
        let before = self.links.len();
        self.links
            .retain(|link| !(link.from_socket == from && link.to_socket == to));
        self.links.len() != before
    }

    /// Remove a node, its sockets and every link touching it.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        let Some(removed) = self.nodes.shift_remove(&node) else {
            return false;
        };
        for socket in removed.inputs.iter().chain(&removed.outputs) {
            self.owners.remove(socket);
        }
        self.links
            .retain(|link| link.from_node != node && link.to_node != node);
        true
    }

    /// Append a link exactly as given, without validation.
    ///
    /// Lets tests reproduce hosts whose link list disagrees with their nodes.
    pub fn push_raw_link(&mut self, link: RawLink) {
        self.links.push(link);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl<T> Default for MemoryTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MemoryTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTree")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links)
            .finish()
    }
}

impl<T> LinkSource for MemoryTree<T> {
    fn tree_id(&self) -> TreeId {
        self.id
    }

    fn links(&self) -> Vec<RawLink> {
        self.links.clone()
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn node_exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn is_reroute(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|entry| entry.reroute)
    }

    fn socket_owner(&self, socket: SocketId) -> Option<NodeId> {
        self.owners.get(&socket).copied()
    }
}

impl<T: Payload> HostGraph<T> for MemoryTree<T> {
    fn inputs(&self, node: NodeId) -> &[SocketId] {
        self.nodes
            .get(&node)
            .map(|entry| entry.inputs.as_slice())
            .unwrap_or_default()
    }

    fn outputs(&self, node: NodeId) -> &[SocketId] {
        self.nodes
            .get(&node)
            .map(|entry| entry.outputs.as_slice())
            .unwrap_or_default()
    }

    fn node_type(&self, node: NodeId) -> Option<&NodeTypeId> {
        self.nodes.get(&node).map(|entry| &entry.node_type)
    }

    fn processor(&mut self, node: NodeId) -> Option<&mut dyn NodeProcessor<T>> {
        let processor: &mut dyn NodeProcessor<T> =
            self.nodes.get_mut(&node)?.processor.as_deref_mut()?;
        Some(processor)
    }
}
