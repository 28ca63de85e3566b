//! Engine Configuration
//!
//! Injected once at startup. The strategy map is the only place that says
//! how a node type is broadcast; the evaluator never hard-codes it.
//!
//! ```json
//! {
//!   "strategies": { "list_sum": "reduce", "text_out": "stateful" },
//!   "keep_unlinked_outputs": false
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::BroadcastStrategy;
use crate::graph::NodeTypeId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Strategy per node type. Unlisted types use `generator`.
    pub strategies: BTreeMap<NodeTypeId, BroadcastStrategy>,

    /// Also store outputs that have no outgoing link.
    pub keep_unlinked_outputs: bool,
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Builder-style strategy assignment.
    pub fn with_strategy(
        mut self,
        node_type: impl Into<NodeTypeId>,
        strategy: BroadcastStrategy,
    ) -> Self {
        self.strategies.insert(node_type.into(), strategy);
        self
    }
}
