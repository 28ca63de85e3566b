//! Data Trees
//!
//! A [`DataTree`] is the data carried by one socket: a single value, a flat
//! list, or lists nested to any depth. Depth may differ between siblings.

use serde::{Deserialize, Serialize};

use super::Payload;

/// Nested socket data.
///
/// The variant alone says whether a node is a leaf, so a leaf can hold any
/// payload, including the "no data" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataTree<T> {
    Leaf(T),
    Branch(Vec<DataTree<T>>),
}

impl<T> DataTree<T> {
    pub fn leaf(value: T) -> Self {
        Self::Leaf(value)
    }

    pub fn branch(children: Vec<DataTree<T>>) -> Self {
        Self::Branch(children)
    }

    /// A branch with no children; the state of a freshly allocated output.
    pub fn empty() -> Self {
        Self::Branch(Vec::new())
    }

    /// A flat list: one branch of leaves.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self::Branch(values.into_iter().map(Self::Leaf).collect())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// The leaf value, if this is a leaf.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Leaf(value) => Some(value),
            Self::Branch(_) => None,
        }
    }

    /// Children of a branch; empty for a leaf.
    pub fn children(&self) -> &[DataTree<T>] {
        match self {
            Self::Leaf(_) => &[],
            Self::Branch(children) => children,
        }
    }

    /// Number of children. A leaf counts as one element.
    pub fn len(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Branch(children) => children.len(),
        }
    }

    /// True only for a branch without children.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Branch(children) if children.is_empty())
    }

    /// Nesting level: 1 for a leaf, else one more than the first child's.
    ///
    /// Counts branch layers down to the leaf inclusive. An empty branch
    /// reports 1.
    pub fn get_level(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Branch(children) => 1 + children.first().map_or(0, Self::get_level),
        }
    }

    /// Whether this is a branch whose children are all leaves.
    pub fn is_leaf_list(&self) -> bool {
        matches!(self, Self::Branch(children) if children.iter().all(Self::is_leaf))
    }

    /// Number of leaves below this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Branch(children) => children.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Leaf values in depth-first order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Self::Leaf(value) => out.push(value),
            Self::Branch(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

impl<T: Clone> DataTree<T> {
    /// Owned leaf values in depth-first order.
    pub fn flatten(&self) -> Vec<T> {
        self.leaves().into_iter().cloned().collect()
    }
}

impl<T: Payload> DataTree<T> {
    /// The stand-in for an unconnected input: one leaf holding no data.
    pub fn dummy() -> Self {
        Self::Leaf(T::no_data())
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self, Self::Leaf(value) if value.is_no_data())
    }
}
