//! Link Records
//!
//! A [`LinkRecord`] is the dependency tracker's view of one edge. Records are
//! rebuilt from the host on every check and never mutated.
//!
//! # Reroute Normalization
//!
//! Reroutes are pass-through nodes that only exist for layout. The tracker
//! must not see them, so [`collect_links`] rewrites the host's raw links:
//!
//! - a link *into* a reroute is not recorded;
//! - a link *out of* a reroute is rewritten to start at the reroute's own
//!   upstream source, following chains of reroutes;
//! - if a reroute's input is unlinked the link is dropped.
//!
//! Muted links are treated as absent before any of this happens: they carry
//! no data and do not count as dependencies.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{NodeId, SocketId};
use crate::error::TopologyInconsistency;
use crate::host::LinkSource;

/// One directed edge from an output socket to an input socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    pub from_node: NodeId,
    pub from_socket: SocketId,
    pub to_node: NodeId,
    pub to_socket: SocketId,
}

impl LinkRecord {
    pub fn new(
        from_node: NodeId,
        from_socket: SocketId,
        to_node: NodeId,
        to_socket: SocketId,
    ) -> Self {
        Self {
            from_node,
            from_socket,
            to_node,
            to_socket,
        }
    }
}

/// A link exactly as the host reports it, reroutes included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawLink {
    pub from_node: NodeId,
    pub from_socket: SocketId,
    pub to_node: NodeId,
    pub to_socket: SocketId,
    /// The destination node is a reroute.
    pub is_reroute_destination: bool,
    /// Muted by the user; the link stays drawn but carries nothing.
    pub is_muted: bool,
}

impl RawLink {
    fn record(&self) -> LinkRecord {
        LinkRecord::new(self.from_node, self.from_socket, self.to_node, self.to_socket)
    }
}

/// Output of [`collect_links`].
#[derive(Debug, Default)]
pub struct NormalizedLinks {
    /// Live links with reroutes removed, in host order.
    pub records: IndexSet<LinkRecord>,
    /// Links skipped because the host contradicted itself.
    pub skipped: Vec<TopologyInconsistency>,
}

impl NormalizedLinks {
    /// Map every linked input socket to the output socket feeding it.
    pub fn upstream(&self) -> HashMap<SocketId, SocketId> {
        self.records
            .iter()
            .map(|link| (link.to_socket, link.from_socket))
            .collect()
    }

    /// Output sockets with at least one outgoing link.
    pub fn linked_outputs(&self) -> HashSet<SocketId> {
        self.records.iter().map(|link| link.from_socket).collect()
    }
}

/// Build the normalized link set of a host graph.
pub fn collect_links<S: LinkSource + ?Sized>(source: &S) -> NormalizedLinks {
    let mut normalized = NormalizedLinks::default();
    let mut valid = Vec::new();

    for raw in source.links().into_iter().filter(|raw| !raw.is_muted) {
        match validate(source, &raw) {
            Ok(()) => valid.push(raw),
            Err(issue) => {
                warn!(tree = %source.tree_id(), %issue, "skipping inconsistent link");
                normalized.skipped.push(issue);
            }
        }
    }

    let is_reroute = |node: NodeId, flagged: &HashSet<NodeId>| {
        flagged.contains(&node) || source.is_reroute(node)
    };

    let flagged: HashSet<NodeId> = valid
        .iter()
        .filter(|raw| raw.is_reroute_destination)
        .map(|raw| raw.to_node)
        .collect();

    // A reroute has one input; the first link into it wins.
    let mut reroute_inputs: HashMap<NodeId, (NodeId, SocketId)> = HashMap::new();
    for raw in valid.iter().filter(|raw| is_reroute(raw.to_node, &flagged)) {
        reroute_inputs
            .entry(raw.to_node)
            .or_insert((raw.from_node, raw.from_socket));
    }

    for raw in valid.iter().filter(|raw| !is_reroute(raw.to_node, &flagged)) {
        let mut record = raw.record();
        let mut visited = HashSet::new();
        let mut resolved = true;

        while is_reroute(record.from_node, &flagged) {
            if !visited.insert(record.from_node) {
                let issue = TopologyInconsistency::RerouteCycle {
                    reroute: record.from_node,
                };
                warn!(tree = %source.tree_id(), %issue, "dropping link");
                normalized.skipped.push(issue);
                resolved = false;
                break;
            }
            match reroute_inputs.get(&record.from_node) {
                Some(&(node, socket)) => {
                    record.from_node = node;
                    record.from_socket = socket;
                }
                None => {
                    resolved = false;
                    break;
                }
            }
        }

        if resolved {
            normalized.records.insert(record);
        }
    }

    normalized
}

fn validate<S: LinkSource + ?Sized>(
    source: &S,
    raw: &RawLink,
) -> Result<(), TopologyInconsistency> {
    for node in [raw.from_node, raw.to_node] {
        if !source.node_exists(node) {
            return Err(TopologyInconsistency::MissingNode { node });
        }
    }
    for (socket, claimed) in [(raw.from_socket, raw.from_node), (raw.to_socket, raw.to_node)] {
        if source.socket_owner(socket) != Some(claimed) {
            return Err(TopologyInconsistency::ForeignSocket { socket, claimed });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::host::MemoryTree;

    #[test]
    fn plain_links_pass_through() {
        let mut tree = MemoryTree::<Value>::new();
        let a = tree.add_node("source", 0, 1);
        let b = tree.add_node("sink", 1, 0);
        tree.link(tree.output(a, 0), tree.input(b, 0));

        let links = collect_links(&tree);
        assert!(links.skipped.is_empty());
        assert_eq!(links.records.len(), 1);
        let link = links.records[0];
        assert_eq!((link.from_node, link.to_node), (a, b));
    }

    #[test]
    fn reroute_chain_collapses() {
        let mut tree = MemoryTree::<Value>::new();
        let x = tree.add_node("source", 0, 1);
        let r1 = tree.add_reroute();
        let r2 = tree.add_reroute();
        let y = tree.add_node("sink", 1, 0);
        tree.link(tree.output(x, 0), tree.input(r1, 0));
        tree.link(tree.output(r1, 0), tree.input(r2, 0));
        tree.link(tree.output(r2, 0), tree.input(y, 0));

        let links = collect_links(&tree);
        assert_eq!(links.records.len(), 1);
        let link = links.records[0];
        assert_eq!(link.from_node, x);
        assert_eq!(link.from_socket, tree.output(x, 0));
        assert_eq!(link.to_node, y);
    }

    #[test]
    fn dangling_reroute_drops_link() {
        let mut tree = MemoryTree::<Value>::new();
        let r = tree.add_reroute();
        let y = tree.add_node("sink", 1, 0);
        tree.link(tree.output(r, 0), tree.input(y, 0));

        let links = collect_links(&tree);
        assert!(links.records.is_empty());
        assert!(links.skipped.is_empty());
    }

    #[test]
    fn reroute_fans_out() {
        let mut tree = MemoryTree::<Value>::new();
        let x = tree.add_node("source", 0, 1);
        let r = tree.add_reroute();
        let y1 = tree.add_node("sink", 1, 0);
        let y2 = tree.add_node("sink", 1, 0);
        tree.link(tree.output(x, 0), tree.input(r, 0));
        tree.link(tree.output(r, 0), tree.input(y1, 0));
        tree.link(tree.output(r, 0), tree.input(y2, 0));

        let links = collect_links(&tree);
        assert_eq!(links.records.len(), 2);
        assert!(links.records.iter().all(|l| l.from_node == x));
    }

    #[test]
    fn reroute_cycle_is_reported() {
        let mut tree = MemoryTree::<Value>::new();
        let r1 = tree.add_reroute();
        let r2 = tree.add_reroute();
        let y = tree.add_node("sink", 1, 0);
        tree.link(tree.output(r1, 0), tree.input(r2, 0));
        tree.link(tree.output(r2, 0), tree.input(r1, 0));
        tree.link(tree.output(r2, 0), tree.input(y, 0));

        let links = collect_links(&tree);
        assert!(links.records.is_empty());
        assert!(matches!(
            links.skipped.as_slice(),
            [TopologyInconsistency::RerouteCycle { .. }]
        ));
    }

    #[test]
    fn inconsistent_link_is_skipped_alone() {
        let mut tree = MemoryTree::<Value>::new();
        let a = tree.add_node("source", 0, 1);
        let b = tree.add_node("sink", 2, 0);
        tree.link(tree.output(a, 0), tree.input(b, 0));
        tree.push_raw_link(RawLink {
            from_node: NodeId::from(999),
            from_socket: tree.output(a, 0),
            to_node: b,
            to_socket: tree.input(b, 1),
            is_reroute_destination: false,
            is_muted: false,
        });

        let links = collect_links(&tree);
        assert_eq!(links.records.len(), 1);
        assert_eq!(
            links.skipped,
            vec![TopologyInconsistency::MissingNode { node: NodeId::from(999) }]
        );
    }

    #[test]
    fn muted_links_are_left_out() {
        let mut tree = MemoryTree::<Value>::new();
        let x = tree.add_node("source", 0, 1);
        let r = tree.add_reroute();
        let y = tree.add_node("sink", 2, 0);
        tree.link(tree.output(x, 0), tree.input(y, 0));
        tree.link(tree.output(x, 0), tree.input(r, 0));
        tree.link(tree.output(r, 0), tree.input(y, 1));

        // Muting the link into the reroute leaves it dangling too.
        assert!(tree.set_muted(tree.output(x, 0), tree.input(r, 0), true));
        let links = collect_links(&tree);

        assert_eq!(links.records.len(), 1);
        assert!(links.skipped.is_empty());
        let link = links.records.first().unwrap();
        assert_eq!(link.to_socket, tree.input(y, 0));
    }
}
