//! Leaf Payloads
//!
//! What a [`DataTree`](super::DataTree) leaf carries. The engine is generic
//! over the payload; it only needs a "no data" sentinel for unconnected
//! inputs and a way to store a whole result list in one leaf.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A value that can live in a tree leaf.
pub trait Payload: Clone + Debug {
    /// The sentinel held by the dummy tree of an unconnected input.
    ///
    /// It is an ordinary leaf value: leaf-ness comes from the tree variant,
    /// never from the payload.
    fn no_data() -> Self;

    fn is_no_data(&self) -> bool;

    /// Pack a list of values into one value.
    fn from_list(items: Vec<Self>) -> Self;
}

/// General-purpose payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// Nothing was connected.
    #[default]
    NoData,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl Payload for Value {
    fn no_data() -> Self {
        Self::NoData
    }

    fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    fn from_list(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}
