//! Engine Facade
//!
//! Ties the dependency tracker to the execution runtime.
//!
//! # Overview
//!
//! One [`Engine`] serves any number of trees. Per tree it remembers the link
//! snapshot of the last check and the outputs of the last pass:
//!
//! ```text
//! host edit ──► update() ──► diff ──► affected ──► topo_order ──► run
//!                                                                  │
//!                              output() / socket_info() ◄── DataStore
//! ```
//!
//! # Design Decisions
//!
//! - Passes are synchronous and never re-entrant. A transfer function that
//!   calls back into `run` gets [`EngineError::PassInProgress`] instead of a
//!   deadlock.
//! - The first `update` of a tree runs every node, since nothing has been
//!   computed yet.
//! - The diff commits before the pass runs. If the pass fails, its seeds are
//!   kept per tree and merged into the next `update`, so a failed node runs
//!   again once it is fixed even when no link changed.

use std::collections::HashMap;

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::config::EngineConfig;
use crate::data::{BroadcastEvaluator, DataStore, DataTree, Payload, StrategyTable};
use crate::error::{EngineError, Result};
use crate::graph::{DiffReport, LinkSetDiffer, NodeId, SocketId, TreeId};
use crate::host::{HostGraph, LinkSource};
use crate::runtime::{GraphRunner, PassReport};

/// Incremental evaluation engine.
pub struct Engine<T> {
    config: EngineConfig,
    differ: LinkSetDiffer,
    evaluator: BroadcastEvaluator,
    store: Mutex<DataStore<T>>,
    /// Seeds of failed passes, per tree.
    pending: Mutex<HashMap<TreeId, IndexSet<NodeId>>>,
}

impl<T: Payload> Engine<T> {
    pub fn new(config: EngineConfig) -> Self {
        let evaluator = BroadcastEvaluator::new(StrategyTable::from(&config));
        Self {
            config,
            differ: LinkSetDiffer::new(),
            evaluator,
            store: Mutex::new(DataStore::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Build an engine from a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(EngineConfig::from_json(json)?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn differ(&self) -> &LinkSetDiffer {
        &self.differ
    }

    /// Nodes affected by link edits since the previous check of this tree.
    pub fn compute_affected<S: LinkSource + ?Sized>(&self, host: &S) -> IndexSet<NodeId> {
        self.differ.compute_affected(host)
    }

    /// Like [`compute_affected`](Self::compute_affected), with skipped links.
    pub fn diff<S: LinkSource + ?Sized>(&self, host: &S) -> DiffReport {
        self.differ.diff(host)
    }

    /// Execute `order` over `host`, replacing the tree's previous outputs.
    pub fn run<H: HostGraph<T> + ?Sized>(
        &self,
        host: &mut H,
        order: &[NodeId],
    ) -> Result<PassReport> {
        let tree = host.tree_id();
        let mut store = self
            .store
            .try_lock()
            .ok_or(EngineError::PassInProgress(tree))?;

        GraphRunner::new(&self.evaluator)
            .keep_unlinked_outputs(self.config.keep_unlinked_outputs)
            .run(&mut *store, host, order)
    }

    /// Diff the host and re-run what changed, plus whatever a failed
    /// earlier pass left pending.
    ///
    /// Returns `None` when no node is affected.
    #[instrument(level = "debug", skip_all, fields(tree = %host.tree_id()))]
    pub fn update<H: HostGraph<T> + ?Sized>(&self, host: &mut H) -> Result<Option<PassReport>> {
        let tree = host.tree_id();
        let first_pass = !self.differ.is_known(tree);
        let report = self.differ.diff(&*host);

        let mut seeds: IndexSet<NodeId> = if first_pass {
            host.node_ids().into_iter().collect()
        } else {
            report.affected
        };
        if let Some(pending) = self.pending.lock().remove(&tree) {
            debug!(pending = pending.len(), "retrying nodes of a failed pass");
            seeds.extend(pending.into_iter().filter(|&node| host.node_exists(node)));
        }
        if seeds.is_empty() {
            debug!("nothing affected");
            return Ok(None);
        }

        let order = host.topo_order(&seeds);
        let pass = match self.run(host, &order) {
            Ok(pass) => pass,
            Err(err) => {
                self.pending.lock().entry(tree).or_default().extend(seeds);
                return Err(err);
            }
        };
        info!(
            seeds = seeds.len(),
            executed = pass.nodes.len(),
            elapsed = ?pass.total_time(),
            "pass complete"
        );
        Ok(Some(pass))
    }

    /// The tree stored for `socket` by the last pass.
    pub fn output(&self, tree: TreeId, socket: SocketId) -> Option<DataTree<T>> {
        self.store.lock().get(tree, socket).cloned()
    }

    /// Size label for `socket`, see [`DataStore::socket_info`].
    pub fn socket_info(&self, tree: TreeId, socket: SocketId) -> Option<String> {
        self.store.lock().socket_info(tree, socket)
    }

    /// Nodes a failed pass left to be re-run by the next `update`.
    pub fn pending(&self, tree: TreeId) -> IndexSet<NodeId> {
        self.pending.lock().get(&tree).cloned().unwrap_or_default()
    }

    /// Forget everything about `tree`. Its next `update` is a full pass.
    pub fn forget_tree(&self, tree: TreeId) {
        self.differ.forget(tree);
        self.pending.lock().remove(&tree);
        self.store.lock().clean(tree);
    }

    /// Forget every tree.
    pub fn reset(&self) {
        self.differ.clear();
        self.pending.lock().clear();
        self.store.lock().clear();
    }
}

impl<T: Payload> Default for Engine<T> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
