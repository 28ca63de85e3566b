//! Link Set Differ
//!
//! Decides which nodes must be re-examined after a graph edit by diffing
//! the tree's live link set against the last committed one. No reachability
//! is computed here; the host's scheduler expands the result.
//!
//! # Algorithm
//!
//! 1. Collect the live links with reroutes normalized away.
//! 2. For every link that was not committed before: mark its destination,
//!    and mark its source when that output socket had no consumer yet.
//! 3. For every previously linked input socket that lost its link: mark its
//!    owner, unless the owner was deleted.
//! 4. Commit the live set and its derived views in a single assignment.

use dashmap::DashMap;
use indexmap::IndexSet;
use tracing::{debug, instrument};

use super::{collect_links, LinkRecord, LinkSnapshot, NodeId, TreeId};
use crate::error::TopologyInconsistency;
use crate::host::LinkSource;

/// Outcome of one diff.
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    /// Newly affected nodes, deduplicated in discovery order.
    pub affected: IndexSet<NodeId>,
    /// Host links that were skipped instead of aborting the diff.
    pub skipped: Vec<TopologyInconsistency>,
}

/// Registry of per-tree link snapshots.
///
/// Snapshots are created the first time a tree is diffed and replaced
/// wholesale on each diff. Callers serialize edits of one tree; the map
/// entry guard makes each read-then-replace atomic.
#[derive(Debug, Default)]
pub struct LinkSetDiffer {
    snapshots: DashMap<TreeId, LinkSnapshot>,
}

impl LinkSetDiffer {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            snapshots: DashMap::new(),
        }
    }

    /// Nodes affected by the link changes since the previous call.
    pub fn compute_affected<S: LinkSource + ?Sized>(&self, source: &S) -> IndexSet<NodeId> {
        self.diff(source).affected
    }

    /// Like [`compute_affected`](Self::compute_affected), also returning the
    /// links that had to be skipped.
    #[instrument(level = "trace", skip_all, fields(tree = %source.tree_id()))]
    pub fn diff<S: LinkSource + ?Sized>(&self, source: &S) -> DiffReport {
        let links = collect_links(source);
        let mut snapshot = self.snapshots.entry(source.tree_id()).or_default();
        let affected = snapshot.advance(links.records, |node| source.node_exists(node));

        debug!(affected = affected.len(), skipped = links.skipped.len(), "link diff done");
        DiffReport {
            affected,
            skipped: links.skipped,
        }
    }

    /// Whether `tree` has been diffed before.
    pub fn is_known(&self, tree: TreeId) -> bool {
        self.snapshots.contains_key(&tree)
    }

    /// The committed links of `tree`, if it has been diffed.
    pub fn committed(&self, tree: TreeId) -> Option<IndexSet<LinkRecord>> {
        self.snapshots
            .get(&tree)
            .map(|snapshot| snapshot.committed().links().clone())
    }

    /// Drop the snapshot of one tree, e.g. after an undo replaced it.
    pub fn forget(&self, tree: TreeId) {
        self.snapshots.remove(&tree);
    }

    /// Drop every snapshot, e.g. after a new file was loaded.
    pub fn clear(&self) {
        self.snapshots.clear();
    }

    /// Number of tracked trees.
    pub fn tree_count(&self) -> usize {
        self.snapshots.len()
    }
}
