//! Structural errors detected while validating a [`SeqNetwork`](crate::SeqNetwork).

use crate::ids::NodeId;
use crate::network::NodeKind;

/// A structural defect in a sequential network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// A node has the wrong number of fanins for its kind.
    #[error("{kind} node {node} has {found} fanins, expected {expected}")]
    WrongArity {
        /// The offending node.
        node: NodeId,
        /// Its kind.
        kind: NodeKind,
        /// Fanins required by the kind.
        expected: usize,
        /// Fanins actually present.
        found: usize,
    },

    /// A fanin refers to a node that does not exist.
    #[error("node {node} reads from missing node {driver}")]
    DanglingFanin {
        /// The reading node.
        node: NodeId,
        /// The missing driver.
        driver: NodeId,
    },

    /// A fanin is driven by a primary output, which has no usable value.
    #[error("node {node} reads from output {driver}")]
    OutputDriver {
        /// The reading node.
        node: NodeId,
        /// The output used as a driver.
        driver: NodeId,
    },

    /// A cycle exists on edges without latches.
    #[error("combinational cycle through node {node}")]
    CombinationalCycle {
        /// A node on the cycle.
        node: NodeId,
    },
}
