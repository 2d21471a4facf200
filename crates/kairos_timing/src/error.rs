//! Errors reported by the cycle-ratio analyses.

use crate::ids::CycleNodeId;

/// A structural problem that makes a cycle-ratio bound meaningless.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleError {
    /// A cycle carries no latches, so no finite period exists.
    #[error("cycle through node {} has no latches", .node.as_raw())]
    ZeroLatchCycle {
        /// A node on the offending cycle.
        node: CycleNodeId,
    },

    /// Latch-free edges form a cycle, so the longest path is unbounded.
    #[error("combinational cycle through node {}", .node.as_raw())]
    CombinationalCycle {
        /// A node on the offending cycle.
        node: CycleNodeId,
    },
}
