//! Transfer Functions
//!
//! A node's behavior, as seen by the broadcast evaluator. Per-leaf
//! strategies call [`NodeProcessor::process`]; list strategies call
//! [`NodeProcessor::process_lists`].
//!
//! Both receive owned values and may have side effects: sink nodes commit
//! their input to the outside world from here.

use thiserror::Error;

use crate::error::BoxError;

/// Returned by the default method bodies of [`NodeProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("node does not accept {0} calls")]
pub struct Unsupported(pub &'static str);

/// The transfer function of one node.
pub trait NodeProcessor<T> {
    /// Map one leaf value per input to one value per output.
    ///
    /// With a single output the returned list is that output's content.
    fn process(&mut self, values: Vec<T>) -> Result<Vec<T>, BoxError> {
        let _ = values;
        Err(Box::new(Unsupported("per-leaf")))
    }

    /// Map one list per input to one value per output.
    fn process_lists(&mut self, lists: Vec<Vec<T>>) -> Result<Vec<T>, BoxError> {
        let _ = lists;
        Err(Box::new(Unsupported("list")))
    }
}

/// Per-leaf processor backed by a closure.
pub struct FnProcessor<F> {
    f: F,
}

/// Wrap a per-leaf closure.
pub fn from_fn<T, F>(f: F) -> FnProcessor<F>
where
    F: FnMut(Vec<T>) -> Result<Vec<T>, BoxError>,
{
    FnProcessor { f }
}

impl<T, F> NodeProcessor<T> for FnProcessor<F>
where
    F: FnMut(Vec<T>) -> Result<Vec<T>, BoxError>,
{
    fn process(&mut self, values: Vec<T>) -> Result<Vec<T>, BoxError> {
        (self.f)(values)
    }
}

/// List processor backed by a closure.
pub struct ListFnProcessor<F> {
    f: F,
}

/// Wrap a list closure, for `Reduce` and `Stateful` nodes.
pub fn from_list_fn<T, F>(f: F) -> ListFnProcessor<F>
where
    F: FnMut(Vec<Vec<T>>) -> Result<Vec<T>, BoxError>,
{
    ListFnProcessor { f }
}

impl<T, F> NodeProcessor<T> for ListFnProcessor<F>
where
    F: FnMut(Vec<Vec<T>>) -> Result<Vec<T>, BoxError>,
{
    fn process_lists(&mut self, lists: Vec<Vec<T>>) -> Result<Vec<T>, BoxError> {
        (self.f)(lists)
    }
}
