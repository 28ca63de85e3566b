//! Error types for the dataflow core.
//!
//! Only broadcast shape problems and transfer failures abort a pass. Topology
//! inconsistencies are recovered locally and reported as values.

use thiserror::Error;

use crate::graph::{NodeId, SocketId, TreeId};

/// Error type returned by node transfer functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// A link or node the host reported but the graph does not back up.
///
/// Diffing and running skip the offending link or node and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyInconsistency {
    /// A link endpoint names a node that does not exist.
    #[error("link references missing {node}")]
    MissingNode { node: NodeId },
    /// A link endpoint names a socket with no owner, or an owner other than
    /// the node the link claims.
    #[error("{socket} does not belong to {claimed}")]
    ForeignSocket { socket: SocketId, claimed: NodeId },
    /// A chain of reroutes loops back on itself.
    #[error("reroute cycle through {reroute}")]
    RerouteCycle { reroute: NodeId },
}

/// Malformed data met while broadcasting a node over its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// An input branch has no children but sibling inputs need `width` rows.
    #[error("empty input branch cannot fill {width} broadcast rows")]
    EmptyBranch { width: usize },

    /// The transfer function returned fewer values than the node has outputs.
    #[error("transfer function produced {produced} values for {expected} outputs")]
    MissingOutputs { expected: usize, produced: usize },
}

/// Errors that abort an engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("broadcast failed on {node}: {source}")]
    Broadcast {
        node: NodeId,
        #[source]
        source: BroadcastError,
    },

    /// The node's own transfer function failed. Never caught by the core.
    #[error("transfer function of {node} failed: {source}")]
    Transfer {
        node: NodeId,
        #[source]
        source: BoxError,
    },

    /// `run` was re-entered while a pass over the same engine was active.
    #[error("an execution pass is already in progress (requested for {0})")]
    PassInProgress(TreeId),

    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Failure raised inside the broadcast recursion.
///
/// Keeps transfer errors apart from shape errors until the runner attaches
/// the node id.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Shape(#[from] BroadcastError),
    #[error(transparent)]
    Transfer(BoxError),
}

impl EvalError {
    /// Attach the failing node.
    pub fn at(self, node: NodeId) -> EngineError {
        match self {
            Self::Shape(source) => EngineError::Broadcast { node, source },
            Self::Transfer(source) => EngineError::Transfer { node, source },
        }
    }
}
