//! Link Snapshots
//!
//! Per-tree state of the dependency tracker. The only state that outlives a
//! single pass.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::{LinkRecord, NodeId, SocketId};

/// A committed link set together with its derived views.
///
/// The views are only ever built by [`CommittedLinks::project`], so they can
/// never drift from `links`.
#[derive(Debug, Clone, Default)]
pub struct CommittedLinks {
    links: IndexSet<LinkRecord>,
    output_sockets: HashSet<SocketId>,
    input_owners: IndexMap<SocketId, NodeId>,
}

impl CommittedLinks {
    /// Derive the socket views of a link set.
    pub fn project(links: IndexSet<LinkRecord>) -> Self {
        let output_sockets = links.iter().map(|link| link.from_socket).collect();
        let input_owners = links
            .iter()
            .map(|link| (link.to_socket, link.to_node))
            .collect();
        Self {
            links,
            output_sockets,
            input_owners,
        }
    }

    pub fn links(&self) -> &IndexSet<LinkRecord> {
        &self.links
    }

    /// Output sockets with at least one consumer.
    pub fn output_sockets(&self) -> &HashSet<SocketId> {
        &self.output_sockets
    }

    /// Linked input sockets and the node owning each.
    pub fn input_owners(&self) -> &IndexMap<SocketId, NodeId> {
        &self.input_owners
    }

    pub fn has_input_socket(&self, socket: SocketId) -> bool {
        self.input_owners.contains_key(&socket)
    }
}

/// Dependency tracker state for one node tree.
#[derive(Debug, Clone, Default)]
pub struct LinkSnapshot {
    current: IndexSet<LinkRecord>,
    committed: CommittedLinks,
}

impl LinkSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The link set seen by the latest check.
    pub fn current(&self) -> &IndexSet<LinkRecord> {
        &self.current
    }

    pub fn committed(&self) -> &CommittedLinks {
        &self.committed
    }

    /// Diff `current` against the committed set, then commit it.
    ///
    /// Returns the affected nodes in discovery order: newly linked nodes
    /// first, then owners of disconnected inputs that still exist.
    pub fn advance(
        &mut self,
        current: IndexSet<LinkRecord>,
        node_exists: impl Fn(NodeId) -> bool,
    ) -> IndexSet<NodeId> {
        let mut affected = IndexSet::new();

        for link in current.difference(self.committed.links()) {
            if !self.committed.output_sockets().contains(&link.from_socket) {
                trace!(node = %link.from_node, socket = %link.from_socket, "output newly consumed");
                affected.insert(link.from_node);
            }
            trace!(node = %link.to_node, socket = %link.to_socket, "input newly linked");
            affected.insert(link.to_node);
        }

        let projected = CommittedLinks::project(current);

        for (&socket, &owner) in self.committed.input_owners() {
            if !projected.has_input_socket(socket) && node_exists(owner) {
                trace!(node = %owner, %socket, "input unlinked");
                affected.insert(owner);
            }
        }

        self.current = projected.links().clone();
        self.committed = projected;
        affected
    }
}
