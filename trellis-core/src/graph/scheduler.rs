//! Reference Scheduler
//!
//! Turns a set of affected nodes into an execution order. Hosts with their
//! own scheduler can ignore this module; [`crate::host::LinkSource`] uses it
//! as the default `topo_order`.
//!
//! # Algorithm
//!
//! 1. Walk dependents breadth-first from the seeds to get the downstream
//!    closure (everything whose inputs may change).
//! 2. Optionally walk dependencies from that closure, so nodes feeding it
//!    are re-run too. A pass starts from an empty socket table, so without
//!    them the closure would read dummy data.
//! 3. Sort the collected nodes with Kahn's algorithm, counting only edges
//!    inside the collection. Ties keep the host's node order.
//!
//! Nodes on a cycle never reach in-degree zero and are left out.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use tracing::warn;

use super::{LinkRecord, NodeId};

/// Node-level adjacency derived from a link set.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    /// Host node order, used to break ties.
    order: Vec<NodeId>,
    /// Nodes each node reads from.
    dependencies: HashMap<NodeId, IndexSet<NodeId>>,
    /// Nodes reading from each node.
    dependents: HashMap<NodeId, IndexSet<NodeId>>,
}

impl DependencyIndex {
    /// Index `links` over the host's `nodes`.
    pub fn new(nodes: &[NodeId], links: &[LinkRecord]) -> Self {
        let mut index = Self {
            order: nodes.to_vec(),
            ..Self::default()
        };
        for link in links {
            index.add_edge(link.from_node, link.to_node);
        }
        index
    }

    /// Add a dependency edge: `dependent` reads from `dependency`.
    pub fn add_edge(&mut self, dependency: NodeId, dependent: NodeId) {
        self.dependents.entry(dependency).or_default().insert(dependent);
        self.dependencies.entry(dependent).or_default().insert(dependency);
    }

    /// The seeds and every node reachable from them through outgoing links.
    pub fn downstream(&self, seeds: &IndexSet<NodeId>) -> HashSet<NodeId> {
        Self::walk(seeds.iter().copied(), &self.dependents)
    }

    /// The given nodes and every node feeding them, transitively.
    pub fn upstream(&self, nodes: impl IntoIterator<Item = NodeId>) -> HashSet<NodeId> {
        Self::walk(nodes, &self.dependencies)
    }

    fn walk(
        start: impl IntoIterator<Item = NodeId>,
        edges: &HashMap<NodeId, IndexSet<NodeId>>,
    ) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<NodeId> = start.into_iter().collect();

        while let Some(node_id) = queue.pop_front() {
            if !visited.insert(node_id) {
                continue;
            }
            if let Some(next) = edges.get(&node_id) {
                queue.extend(next.iter().copied());
            }
        }

        visited
    }

    /// Sort `nodes` so dependencies come before dependents.
    pub fn topological_sort(&self, nodes: &HashSet<NodeId>) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut result = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::new();

        // Host order first, then anything the host did not list.
        let mut ordered: Vec<NodeId> =
            self.order.iter().copied().filter(|n| nodes.contains(n)).collect();
        let listed: HashSet<NodeId> = ordered.iter().copied().collect();
        let mut unlisted: Vec<NodeId> =
            nodes.iter().copied().filter(|n| !listed.contains(n)).collect();
        unlisted.sort();
        ordered.extend(unlisted);

        for &node_id in &ordered {
            let degree = self
                .dependencies
                .get(&node_id)
                .map(|deps| deps.iter().filter(|d| nodes.contains(d)).count())
                .unwrap_or(0);
            in_degree.insert(node_id, degree);
            if degree == 0 {
                queue.push_back(node_id);
            }
        }

        // Kahn's algorithm
        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);

            if let Some(dependents) = self.dependents.get(&node_id) {
                for dependent_id in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent_id) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(*dependent_id);
                        }
                    }
                }
            }
        }

        if result.len() < ordered.len() {
            warn!(
                dropped = ordered.len() - result.len(),
                "cycle detected, nodes on it are not scheduled"
            );
        }

        result
    }
}

/// Topological order of the downstream closure of `seeds`.
pub fn downstream_order(
    nodes: &[NodeId],
    links: &[LinkRecord],
    seeds: &IndexSet<NodeId>,
) -> Vec<NodeId> {
    let index = DependencyIndex::new(nodes, links);
    let closure = index.downstream(seeds);
    index.topological_sort(&closure)
}

/// Topological order of the downstream closure of `seeds` plus every node
/// feeding it.
pub fn execution_order(
    nodes: &[NodeId],
    links: &[LinkRecord],
    seeds: &IndexSet<NodeId>,
) -> Vec<NodeId> {
    let index = DependencyIndex::new(nodes, links);
    let closure = index.downstream(seeds);
    let needed = index.upstream(closure);
    index.topological_sort(&needed)
}
