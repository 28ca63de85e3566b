//! Socket Data Store
//!
//! The `(tree, socket) -> DataTree` table filled during an execution pass.
//! Output trees are owned here; consumers only ever borrow them.

use std::collections::HashMap;

use crate::graph::{SocketId, TreeId};

use super::DataTree;

/// Output trees of every tree's last pass.
#[derive(Debug)]
pub struct DataStore<T> {
    trees: HashMap<TreeId, HashMap<SocketId, DataTree<T>>>,
}

impl<T> Default for DataStore<T> {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }
}

impl<T> DataStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every stored output of `tree`.
    pub fn clean(&mut self, tree: TreeId) {
        if let Some(sockets) = self.trees.get_mut(&tree) {
            sockets.clear();
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.trees.clear();
    }

    pub fn get(&self, tree: TreeId, socket: SocketId) -> Option<&DataTree<T>> {
        self.trees.get(&tree)?.get(&socket)
    }

    pub fn insert(&mut self, tree: TreeId, socket: SocketId, data: DataTree<T>) {
        self.trees.entry(tree).or_default().insert(socket, data);
    }

    pub fn contains(&self, tree: TreeId, socket: SocketId) -> bool {
        self.get(tree, socket).is_some()
    }

    /// Number of stored sockets of `tree`.
    pub fn socket_count(&self, tree: TreeId) -> usize {
        self.trees.get(&tree).map_or(0, HashMap::len)
    }

    /// Short size label for a socket, as an editor shows next to it.
    ///
    /// The top-level element count, or `None` when nothing is stored or the
    /// stored branch is empty.
    pub fn socket_info(&self, tree: TreeId, socket: SocketId) -> Option<String> {
        match self.get(tree, socket)? {
            DataTree::Branch(children) if children.is_empty() => None,
            data => Some(data.len().to_string()),
        }
    }
}
