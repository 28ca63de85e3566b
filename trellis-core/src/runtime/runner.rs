//! Graph Runner
//!
//! Drives one execution pass over a host graph:
//!
//! 1. Clear the tree's socket table.
//! 2. Resolve every input socket to the output feeding it, reroutes removed.
//! 3. For each node in the given order: borrow its input trees (or the dummy
//!    tree), register empty output trees, evaluate the node with its
//!    strategy, and store what it produced.
//!
//! Nodes without a transfer function (viewers, frames, group sockets) store
//! nothing, so anything reading their outputs gets the dummy tree.
//!
//! Any error aborts the pass. The table is left half-filled and the next
//! pass clears it anyway.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tracing::{debug, instrument, warn};

use crate::data::{BroadcastEvaluator, BroadcastStrategy, DataStore, DataTree, Payload};
use crate::error::{Result, TopologyInconsistency};
use crate::graph::{collect_links, NodeId, SocketId, TreeId};
use crate::host::HostGraph;

/// What one node did during a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStats {
    pub node: NodeId,
    pub strategy: BroadcastStrategy,
    pub elapsed: Duration,
    /// `get_level` of every stored output, in socket order.
    pub output_levels: Vec<usize>,
}

/// Summary of a completed pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub tree: TreeId,
    /// Executed nodes, in execution order.
    pub nodes: Vec<NodeStats>,
    /// Links and nodes skipped because the host contradicted itself.
    pub skipped: Vec<TopologyInconsistency>,
}

impl PassReport {
    /// Ids of the executed nodes, in execution order.
    pub fn executed(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|stats| stats.node).collect()
    }

    pub fn stats(&self, node: NodeId) -> Option<&NodeStats> {
        self.nodes.iter().find(|stats| stats.node == node)
    }

    pub fn total_time(&self) -> Duration {
        self.nodes.iter().map(|stats| stats.elapsed).sum()
    }
}

/// Executes nodes in a caller-supplied order.
#[derive(Debug, Clone, Copy)]
pub struct GraphRunner<'e> {
    evaluator: &'e BroadcastEvaluator,
    keep_unlinked_outputs: bool,
}

impl<'e> GraphRunner<'e> {
    pub fn new(evaluator: &'e BroadcastEvaluator) -> Self {
        Self {
            evaluator,
            keep_unlinked_outputs: false,
        }
    }

    /// Also store outputs that nothing reads.
    pub fn keep_unlinked_outputs(mut self, keep: bool) -> Self {
        self.keep_unlinked_outputs = keep;
        self
    }

    /// Run one pass over `order`, which must be topologically sorted.
    #[instrument(level = "trace", skip_all, fields(tree = %host.tree_id(), nodes = order.len()))]
    pub fn run<T, H>(
        &self,
        store: &mut DataStore<T>,
        host: &mut H,
        order: &[NodeId],
    ) -> Result<PassReport>
    where
        T: Payload,
        H: HostGraph<T> + ?Sized,
    {
        let tree = host.tree_id();
        store.clean(tree);

        let links = collect_links(&*host);
        let upstream = links.upstream();
        let linked_outputs = links.linked_outputs();
        let dummy = DataTree::dummy();

        let mut report = PassReport {
            tree,
            nodes: Vec::with_capacity(order.len()),
            skipped: links.skipped,
        };

        for &node in order {
            if !host.node_exists(node) {
                let issue = TopologyInconsistency::MissingNode { node };
                warn!(%issue, "skipping node");
                report.skipped.push(issue);
                continue;
            }
            if host.is_reroute(node) {
                continue;
            }

            let inputs: SmallVec<[SocketId; 4]> = SmallVec::from_slice(host.inputs(node));
            let outputs: SmallVec<[SocketId; 4]> = SmallVec::from_slice(host.outputs(node));
            let strategy = self.evaluator.strategy_of(host.node_type(node));
            let kept: SmallVec<[bool; 4]> = outputs
                .iter()
                .map(|socket| self.keep_unlinked_outputs || linked_outputs.contains(socket))
                .collect();

            let Some(processor) = host.processor(node) else {
                debug!(%node, "no transfer function, outputs left unset");
                continue;
            };

            // Registered before the call so lookups of this node's own
            // outputs resolve to an empty tree.
            for (&socket, _) in outputs.iter().zip(&kept).filter(|(_, keep)| **keep) {
                store.insert(tree, socket, DataTree::empty());
            }

            let started = Instant::now();
            let produced = {
                let views: SmallVec<[&DataTree<T>; 4]> = inputs
                    .iter()
                    .map(|&socket| resolve(store, tree, &upstream, socket, &dummy))
                    .collect();
                self.evaluator
                    .evaluate(strategy, &views, outputs.len(), processor)
                    .map_err(|err| err.at(node))?
            };
            let elapsed = started.elapsed();

            let mut output_levels = Vec::with_capacity(outputs.len());
            for ((&socket, data), &keep) in outputs.iter().zip(produced).zip(&kept) {
                if keep {
                    output_levels.push(data.get_level());
                    store.insert(tree, socket, data);
                }
            }

            debug!(%node, %strategy, ?elapsed, "node executed");
            report.nodes.push(NodeStats {
                node,
                strategy,
                elapsed,
                output_levels,
            });
        }

        Ok(report)
    }
}

/// The tree an input socket reads: its producer's stored output, or the
/// dummy tree when unlinked or when the producer did not run this pass.
fn resolve<'a, T>(
    store: &'a DataStore<T>,
    tree: TreeId,
    upstream: &HashMap<SocketId, SocketId>,
    socket: SocketId,
    dummy: &'a DataTree<T>,
) -> &'a DataTree<T> {
    match upstream.get(&socket) {
        Some(&source) => store.get(tree, source).unwrap_or_else(|| {
            debug!(%socket, %source, "producer has no data this pass, using dummy");
            dummy
        }),
        None => dummy,
    }
}
