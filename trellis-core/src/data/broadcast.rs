//! Broadcast Evaluation
//!
//! Maps a node's transfer function over input trees whose depths may differ
//! from socket to socket.
//!
//! # Extend-last Matching
//!
//! At each level every branch input is matched against the widest one. A
//! shorter branch repeats its last child; a leaf repeats itself:
//!
//! ```text
//! [a, b, c, d]   [x, y]   s
//!  a             x        s
//!  b             y        s
//!  c             y        s
//!  d             y        s
//! ```
//!
//! # Strategies
//!
//! All strategies except `Stateful` share the same recursion and differ only
//! in where it stops and how results are stored:
//!
//! | strategy  | stops when                 | single output gets           |
//! |-----------|----------------------------|------------------------------|
//! | Generator | every input is a leaf      | a branch of result leaves    |
//! | Level     | every input is a leaf      | one leaf packing the results |
//! | Reduce    | every input is a leaf list | one leaf packing the results |
//!
//! `Stateful` flattens every input and calls the function exactly once.

use smallvec::SmallVec;
use tracing::trace;

use super::{BroadcastStrategy, DataTree, Payload, StrategyTable};
use crate::error::{BroadcastError, EvalError};
use crate::graph::NodeTypeId;
use crate::runtime::NodeProcessor;

/// One broadcast row: the tree each input contributes at one index.
pub type Row<'a, T> = SmallVec<[&'a DataTree<T>; 4]>;

/// Match `trees` at their top level with the extend-last policy.
///
/// Produces `width` rows in increasing index order, where `width` is the
/// longest branch's child count, or 1 when every tree is a leaf. If every
/// branch is empty there are no rows.
pub fn zip_broadcast<'a, T>(trees: &[&'a DataTree<T>]) -> Result<Vec<Row<'a, T>>, BroadcastError> {
    let width = trees
        .iter()
        .filter(|tree| !tree.is_leaf())
        .map(|tree| tree.len())
        .max()
        .unwrap_or(1);

    if width > 0 && trees.iter().any(|tree| tree.is_empty()) {
        return Err(BroadcastError::EmptyBranch { width });
    }

    let rows: Vec<Row<'a, T>> = (0..width)
        .map(|index| {
            trees
                .iter()
                .map(|&tree| match tree {
                    DataTree::Leaf(_) => tree,
                    DataTree::Branch(children) => &children[index.min(children.len() - 1)],
                })
                .collect::<Row<'a, T>>()
        })
        .collect();

    Ok(rows)
}

/// Where a recursive strategy stops, and what it does there.
#[derive(Debug, Clone, Copy)]
enum Base {
    /// Stop at leaves; with one output either ungroup or pack the result.
    Leaves { ungroup: bool },
    /// Stop at lists of leaves; pack the result.
    LeafLists,
}

impl Base {
    fn reached<T>(self, inputs: &[&DataTree<T>]) -> bool {
        match self {
            Self::Leaves { .. } => inputs.iter().all(|tree| tree.is_leaf()),
            // An empty branch is no list to reduce; it falls through to a
            // zero-width level.
            Self::LeafLists => inputs
                .iter()
                .all(|tree| tree.is_leaf() || (tree.is_leaf_list() && !tree.is_empty())),
        }
    }
}

/// Applies transfer functions according to a node type's strategy.
#[derive(Debug, Clone, Default)]
pub struct BroadcastEvaluator {
    strategies: StrategyTable,
}

impl BroadcastEvaluator {
    pub fn new(strategies: StrategyTable) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    pub fn strategy_of(&self, node_type: Option<&NodeTypeId>) -> BroadcastStrategy {
        self.strategies.strategy_of(node_type)
    }

    /// Run `processor` over `inputs`, producing `output_count` trees.
    ///
    /// Transfer function errors are passed through untouched.
    pub fn evaluate<T: Payload>(
        &self,
        strategy: BroadcastStrategy,
        inputs: &[&DataTree<T>],
        output_count: usize,
        processor: &mut dyn NodeProcessor<T>,
    ) -> Result<Vec<DataTree<T>>, EvalError> {
        trace!(%strategy, inputs = inputs.len(), outputs = output_count, "evaluating node");
        match strategy {
            BroadcastStrategy::Generator => {
                recurse(inputs, output_count, Base::Leaves { ungroup: true }, processor)
            }
            BroadcastStrategy::Level => {
                recurse(inputs, output_count, Base::Leaves { ungroup: false }, processor)
            }
            BroadcastStrategy::Reduce => recurse(inputs, output_count, Base::LeafLists, processor),
            BroadcastStrategy::Stateful => stateful(inputs, output_count, processor),
        }
    }
}

fn recurse<T: Payload>(
    inputs: &[&DataTree<T>],
    output_count: usize,
    base: Base,
    processor: &mut dyn NodeProcessor<T>,
) -> Result<Vec<DataTree<T>>, EvalError> {
    if base.reached(inputs) {
        return match base {
            Base::Leaves { ungroup } => {
                let values = inputs.iter().filter_map(|tree| tree.value().cloned()).collect();
                let result = processor.process(values).map_err(EvalError::Transfer)?;
                store(result, output_count, ungroup)
            }
            Base::LeafLists => {
                let lists = inputs.iter().map(|tree| tree.flatten()).collect();
                let result = processor.process_lists(lists).map_err(EvalError::Transfer)?;
                store(result, output_count, false)
            }
        };
    }

    let rows = zip_broadcast(inputs)?;
    let mut branches: Vec<Vec<DataTree<T>>> = (0..output_count)
        .map(|_| Vec::with_capacity(rows.len()))
        .collect();

    for row in &rows {
        let produced = recurse(row, output_count, base, processor)?;
        for (branch, tree) in branches.iter_mut().zip(produced) {
            branch.push(tree);
        }
    }

    Ok(branches.into_iter().map(DataTree::Branch).collect())
}

fn stateful<T: Payload>(
    inputs: &[&DataTree<T>],
    output_count: usize,
    processor: &mut dyn NodeProcessor<T>,
) -> Result<Vec<DataTree<T>>, EvalError> {
    let lists = inputs.iter().map(|tree| tree.flatten()).collect();
    let result = processor.process_lists(lists).map_err(EvalError::Transfer)?;
    spread(result, output_count)
}

/// Store one call's result at the current position of every output.
fn store<T: Payload>(
    result: Vec<T>,
    output_count: usize,
    ungroup: bool,
) -> Result<Vec<DataTree<T>>, EvalError> {
    match output_count {
        0 => Ok(Vec::new()),
        1 if ungroup => Ok(vec![DataTree::from_values(result)]),
        1 => Ok(vec![DataTree::Leaf(T::from_list(result))]),
        _ => spread(result, output_count),
    }
}

/// Result `i` becomes the leaf of output `i`.
fn spread<T>(result: Vec<T>, output_count: usize) -> Result<Vec<DataTree<T>>, EvalError> {
    if result.len() < output_count {
        return Err(BroadcastError::MissingOutputs {
            expected: output_count,
            produced: result.len(),
        }
        .into());
    }
    Ok(result
        .into_iter()
        .take(output_count)
        .map(DataTree::Leaf)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::error::BoxError;
    use crate::runtime::{from_fn, from_list_fn};

    fn int(v: i64) -> DataTree<Value> {
        DataTree::leaf(Value::Int(v))
    }

    fn ints(values: &[i64]) -> DataTree<Value> {
        DataTree::from_values(values.iter().map(|&v| Value::Int(v)))
    }

    fn row_values(row: &Row<'_, Value>) -> Vec<Option<i64>> {
        row.iter().map(|tree| tree.value().and_then(Value::as_int)).collect()
    }

    fn duplicate(values: Vec<Value>) -> Result<Vec<Value>, BoxError> {
        Ok(vec![values[0].clone(), values[0].clone()])
    }

    #[test]
    fn zip_extends_last_child() {
        let long = ints(&[1, 2, 3, 4, 5]);
        let short = ints(&[10, 11]);
        let rows = zip_broadcast(&[&long, &short]).unwrap();

        assert_eq!(rows.len(), 5);
        assert_eq!(row_values(&rows[0]), vec![Some(1), Some(10)]);
        assert_eq!(row_values(&rows[1]), vec![Some(2), Some(11)]);
        for row in &rows[2..] {
            assert_eq!(row[1].value(), Some(&Value::Int(11)));
        }
    }

    #[test]
    fn zip_repeats_leaves_in_every_row() {
        let list = ints(&[1, 2, 3]);
        let scalar = int(7);
        let rows = zip_broadcast(&[&scalar, &list]).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row[0].value() == Some(&Value::Int(7))));
    }

    #[test]
    fn zip_of_leaves_is_one_row() {
        let a = int(1);
        let b = int(2);
        let rows = zip_broadcast(&[&a, &b]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(row_values(&rows[0]), vec![Some(1), Some(2)]);
    }

    #[test]
    fn zip_of_empty_branches_has_no_rows() {
        let empty = DataTree::<Value>::empty();
        let scalar = int(1);
        assert!(zip_broadcast(&[&empty, &scalar]).unwrap().is_empty());
    }

    #[test]
    fn zip_rejects_empty_branch_next_to_full_one() {
        let empty = DataTree::<Value>::empty();
        let full = ints(&[1, 2]);
        assert_eq!(
            zip_broadcast(&[&full, &empty]).unwrap_err(),
            BroadcastError::EmptyBranch { width: 2 }
        );
    }

    #[test]
    fn generator_ungroups_single_output() {
        let evaluator = BroadcastEvaluator::default();
        let input = ints(&[2, 3]);
        let mut node = from_fn(duplicate);

        let out = evaluator
            .evaluate(BroadcastStrategy::Generator, &[&input], 1, &mut node)
            .unwrap();

        assert_eq!(out, vec![DataTree::branch(vec![ints(&[2, 2]), ints(&[3, 3])])]);
    }

    #[test]
    fn level_keeps_result_as_one_value() {
        let evaluator = BroadcastEvaluator::default();
        let input = ints(&[2, 3]);
        let mut node = from_fn(duplicate);

        let out = evaluator
            .evaluate(BroadcastStrategy::Level, &[&input], 1, &mut node)
            .unwrap();

        let list = |v: i64| DataTree::leaf(Value::List(vec![Value::Int(v), Value::Int(v)]));
        assert_eq!(out, vec![DataTree::branch(vec![list(2), list(3)])]);
    }

    #[test]
    fn generator_broadcasts_mismatched_depths() {
        // One scalar against a list of lists.
        let evaluator = BroadcastEvaluator::default();
        let offset = int(100);
        let nested = DataTree::branch(vec![ints(&[1, 2]), ints(&[3])]);
        let mut add = from_fn(|values: Vec<Value>| {
            let sum = values.iter().filter_map(Value::as_int).sum::<i64>();
            Ok(vec![Value::Int(sum)])
        });

        let out = evaluator
            .evaluate(BroadcastStrategy::Level, &[&offset, &nested], 1, &mut add)
            .unwrap();

        let packed = |v: i64| DataTree::leaf(Value::List(vec![Value::Int(v)]));
        assert_eq!(
            out,
            vec![DataTree::branch(vec![
                DataTree::branch(vec![packed(101), packed(102)]),
                DataTree::branch(vec![packed(103)]),
            ])]
        );
    }

    #[test]
    fn multiple_outputs_get_one_leaf_each() {
        let evaluator = BroadcastEvaluator::default();
        let input = ints(&[5, 6]);
        let mut split = from_fn(|values: Vec<Value>| {
            let v = values[0].as_int().unwrap_or_default();
            Ok(vec![Value::Int(v / 2), Value::Int(v % 2)])
        });

        let out = evaluator
            .evaluate(BroadcastStrategy::Generator, &[&input], 2, &mut split)
            .unwrap();

        assert_eq!(out, vec![ints(&[2, 3]), ints(&[1, 0])]);
    }

    #[test]
    fn short_result_is_a_shape_error() {
        let evaluator = BroadcastEvaluator::default();
        let input = int(1);
        let mut single = from_fn(|values: Vec<Value>| Ok(values));

        let err = evaluator
            .evaluate(BroadcastStrategy::Generator, &[&input], 3, &mut single)
            .unwrap_err();

        assert!(matches!(
            err,
            EvalError::Shape(BroadcastError::MissingOutputs { expected: 3, produced: 1 })
        ));
    }

    #[test]
    fn zero_outputs_still_call_the_function() {
        let evaluator = BroadcastEvaluator::default();
        let input = ints(&[1, 2, 3]);
        let mut seen = Vec::new();
        let mut sink = from_fn(|values: Vec<Value>| {
            seen.push(values[0].clone());
            Ok(Vec::new())
        });

        let out = evaluator
            .evaluate(BroadcastStrategy::Generator, &[&input], 0, &mut sink)
            .unwrap();

        assert!(out.is_empty());
        drop(sink);
        assert_eq!(seen, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn reduce_stops_at_leaf_lists() {
        let evaluator = BroadcastEvaluator::default();
        let nested = DataTree::branch(vec![ints(&[1, 2, 3]), ints(&[4, 5])]);
        let mut sum = from_list_fn(|lists: Vec<Vec<Value>>| {
            Ok(vec![Value::Int(lists[0].iter().filter_map(Value::as_int).sum())])
        });

        let out = evaluator
            .evaluate(BroadcastStrategy::Reduce, &[&nested], 1, &mut sum)
            .unwrap();

        let packed = |v: i64| DataTree::leaf(Value::List(vec![Value::Int(v)]));
        assert_eq!(out, vec![DataTree::branch(vec![packed(6), packed(9)])]);
    }

    #[test]
    fn reduce_of_empty_input_calls_nothing() {
        let evaluator = BroadcastEvaluator::default();
        let empty = DataTree::<Value>::empty();
        let mut calls = 0;
        let mut sum = from_list_fn(|lists: Vec<Vec<Value>>| {
            calls += 1;
            Ok(vec![Value::Int(lists[0].iter().filter_map(Value::as_int).sum())])
        });

        let out = evaluator
            .evaluate(BroadcastStrategy::Reduce, &[&empty], 1, &mut sum)
            .unwrap();

        drop(sum);
        assert_eq!(calls, 0);
        assert_eq!(out, vec![DataTree::empty()]);
    }

    #[test]
    fn reduce_matches_a_flat_list_against_nested_lists() {
        // [1, 2] is already a leaf list; the nested input is one level deeper,
        // so the flat list is walked leaf by leaf against its sublists.
        let evaluator = BroadcastEvaluator::default();
        let flat = ints(&[1, 2]);
        let nested = DataTree::branch(vec![ints(&[1, 2, 3]), ints(&[4])]);
        let mut seen = Vec::new();
        let mut total = from_list_fn(|lists: Vec<Vec<Value>>| {
            seen.push(lists.iter().map(Vec::len).collect::<Vec<_>>());
            let sum = lists.iter().flatten().filter_map(Value::as_int).sum();
            Ok(vec![Value::Int(sum)])
        });

        let out = evaluator
            .evaluate(BroadcastStrategy::Reduce, &[&flat, &nested], 1, &mut total)
            .unwrap();

        drop(total);
        assert_eq!(seen, vec![vec![1, 3], vec![1, 1]]);
        let packed = |v: i64| DataTree::leaf(Value::List(vec![Value::Int(v)]));
        assert_eq!(out, vec![DataTree::branch(vec![packed(7), packed(6)])]);
    }

    #[test]
    fn stateful_short_result_is_a_shape_error() {
        let evaluator = BroadcastEvaluator::default();
        let input = ints(&[1, 2]);
        let mut count =
            from_list_fn(|lists: Vec<Vec<Value>>| Ok(vec![Value::Int(lists[0].len() as i64)]));

        let err = evaluator
            .evaluate(BroadcastStrategy::Stateful, &[&input], 2, &mut count)
            .unwrap_err();

        assert!(matches!(
            err,
            EvalError::Shape(BroadcastError::MissingOutputs { expected: 2, produced: 1 })
        ));
    }

    #[test]
    fn stateful_calls_once_with_everything() {
        let evaluator = BroadcastEvaluator::default();
        let nested = DataTree::branch(vec![ints(&[1, 2]), ints(&[3])]);
        let scalar = int(10);
        let mut calls = 0;
        let mut total = from_list_fn(|lists: Vec<Vec<Value>>| {
            calls += 1;
            let sizes: Vec<Value> = lists.iter().map(|l| Value::Int(l.len() as i64)).collect();
            Ok(sizes)
        });

        let out = evaluator
            .evaluate(BroadcastStrategy::Stateful, &[&nested, &scalar], 2, &mut total)
            .unwrap();

        drop(total);
        assert_eq!(calls, 1);
        assert_eq!(out, vec![int(3), int(1)]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let evaluator = BroadcastEvaluator::default();
        let empty = DataTree::<Value>::empty();
        let mut node = from_fn(duplicate);

        let out = evaluator
            .evaluate(BroadcastStrategy::Generator, &[&empty], 1, &mut node)
            .unwrap();

        assert_eq!(out, vec![DataTree::empty()]);
    }

    #[test]
    fn rows_are_visited_in_index_order() {
        let evaluator = BroadcastEvaluator::default();
        let a = ints(&[1, 2, 3]);
        let b = ints(&[10]);
        let mut order = Vec::new();
        let mut log = from_fn(|values: Vec<Value>| {
            order.push((values[0].as_int(), values[1].as_int()));
            Ok(Vec::new())
        });

        evaluator
            .evaluate(BroadcastStrategy::Generator, &[&a, &b], 0, &mut log)
            .unwrap();

        drop(log);
        assert_eq!(
            order,
            vec![(Some(1), Some(10)), (Some(2), Some(10)), (Some(3), Some(10))]
        );
    }
}
