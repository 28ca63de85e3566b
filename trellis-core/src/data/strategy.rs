//! Broadcast Strategies
//!
//! Which recursion a node type uses to map its transfer function over
//! nested inputs. Selected per node type through a [`StrategyTable`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::graph::NodeTypeId;

/// How a node's transfer function is broadcast over its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastStrategy {
    /// Call per leaf combination; a single output is ungrouped one level.
    #[default]
    Generator,
    /// Call per leaf combination; results replace the output leaf as is.
    Level,
    /// Call per combination of leaf lists; the function reduces each list.
    Reduce,
    /// Call once with every input flattened.
    Stateful,
}

impl fmt::Display for BroadcastStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Generator => "generator",
            Self::Level => "level",
            Self::Reduce => "reduce",
            Self::Stateful => "stateful",
        };
        f.write_str(name)
    }
}

/// Node type → strategy lookup. Unlisted types use [`BroadcastStrategy::Generator`].
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    entries: HashMap<NodeTypeId, BroadcastStrategy>,
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, node_type: impl Into<NodeTypeId>, strategy: BroadcastStrategy) -> Self {
        self.insert(node_type, strategy);
        self
    }

    pub fn insert(&mut self, node_type: impl Into<NodeTypeId>, strategy: BroadcastStrategy) {
        self.entries.insert(node_type.into(), strategy);
    }

    /// Strategy for `node_type`; `None` means an untyped node.
    pub fn strategy_of(&self, node_type: Option<&NodeTypeId>) -> BroadcastStrategy {
        node_type
            .and_then(|ty| self.entries.get(ty))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&EngineConfig> for StrategyTable {
    fn from(config: &EngineConfig) -> Self {
        Self {
            entries: config
                .strategies
                .iter()
                .map(|(ty, strategy)| (ty.clone(), *strategy))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlisted_types_default_to_generator() {
        let table = StrategyTable::new().with("list_sum", BroadcastStrategy::Reduce);
        assert_eq!(
            table.strategy_of(Some(&NodeTypeId::from("list_sum"))),
            BroadcastStrategy::Reduce
        );
        assert_eq!(
            table.strategy_of(Some(&NodeTypeId::from("scalar_math"))),
            BroadcastStrategy::Generator
        );
        assert_eq!(table.strategy_of(None), BroadcastStrategy::Generator);
    }

    #[test]
    fn strategies_use_snake_case_names() {
        let json = serde_json::to_string(&BroadcastStrategy::Stateful).unwrap();
        assert_eq!(json, "\"stateful\"");
        assert_eq!(BroadcastStrategy::Level.to_string(), "level");
    }
}
