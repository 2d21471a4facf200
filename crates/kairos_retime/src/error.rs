//! Errors reported by a retiming invocation.

use crate::codes;
use crate::moves::Direction;
use crate::sat::SatError;
use kairos_common::InternalError;
use kairos_diagnostics::{Diagnostic, DiagnosticCode};
use kairos_ir::NetworkError;

/// A failed retiming invocation. The input network is never modified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetimeError {
    /// Even the acyclic upper bound is infeasible.
    #[error("period {period} from the acyclic bound is infeasible")]
    InfeasibleUpperBound {
        /// The upper bound that failed.
        period: f64,
    },

    /// A scheduling pass could not make progress.
    #[error("{direction} schedule stalled with {remaining} moves outstanding")]
    ScheduleStall {
        /// The phase that stalled.
        direction: Direction,
        /// Moves still owed, summed over nodes.
        remaining: u64,
        /// Labels of the blocked nodes.
        nodes: Vec<String>,
    },

    /// Latch-free edges form a cycle.
    #[error("combinational cycle through {node}")]
    CombinationalCycle {
        /// A node on the cycle.
        node: String,
    },

    /// The network violates a structural rule.
    #[error("malformed network: {0}")]
    Malformed(String),

    /// A single move was requested without a latch to move.
    #[error("cannot retime {node} {direction}: no latch available")]
    MoveUnavailable {
        /// The node.
        node: String,
        /// The requested direction.
        direction: Direction,
    },

    /// Neither phase of a node has a library match.
    #[error("no library gate implements {node} in either phase")]
    NoMatch {
        /// The node.
        node: String,
    },

    /// The library returned an unusable match.
    #[error("invalid library: {0}")]
    InvalidLibrary(String),

    /// The cut oracle returned an inconsistent cut.
    #[error("malformed cut at {node}: {reason}")]
    MalformedCut {
        /// The cut root.
        node: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The mapped period needs backward moves.
    #[error("mapped period {period} is not reachable with forward moves only")]
    ForwardOnlyInfeasible {
        /// The period that needed backward moves.
        period: f64,
    },

    /// The SAT solver failed.
    #[error(transparent)]
    Sat(#[from] SatError),

    /// An internal invariant broke.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<NetworkError> for RetimeError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::CombinationalCycle { node } => RetimeError::CombinationalCycle {
                node: node.to_string(),
            },
            other => RetimeError::Malformed(other.to_string()),
        }
    }
}

impl RetimeError {
    /// Shorthand for an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        RetimeError::Internal(InternalError::new(message))
    }

    /// The diagnostic code reported for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            RetimeError::InfeasibleUpperBound { .. } => codes::INFEASIBLE_UPPER_BOUND,
            RetimeError::ScheduleStall { .. } => codes::SCHEDULE_STALL,
            RetimeError::CombinationalCycle { .. } | RetimeError::Malformed(_) => {
                codes::MALFORMED_NETWORK
            }
            RetimeError::NoMatch { .. }
            | RetimeError::InvalidLibrary(_)
            | RetimeError::MalformedCut { .. } => codes::MAPPING_FAILURE,
            RetimeError::MoveUnavailable { .. }
            | RetimeError::ForwardOnlyInfeasible { .. }
            | RetimeError::Sat(_)
            | RetimeError::Internal(_) => codes::INTERNAL,
        }
    }

    /// Renders the error as a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            RetimeError::InfeasibleUpperBound { .. } => diag
                .with_note("some logic is not reachable from any primary input or constant")
                .with_help("raise `margin` or check the network for floating loops"),
            RetimeError::ScheduleStall { nodes, .. } => {
                let mut diag = diag;
                if let Some(first) = nodes.first() {
                    diag = diag.with_subject(first.clone());
                }
                if nodes.len() > 1 {
                    diag = diag.with_note(format!("blocked nodes: {}", nodes.join(", ")));
                }
                diag
            }
            RetimeError::CombinationalCycle { node }
            | RetimeError::NoMatch { node }
            | RetimeError::MalformedCut { node, .. }
            | RetimeError::MoveUnavailable { node, .. } => diag.with_subject(node.clone()),
            RetimeError::ForwardOnlyInfeasible { .. } => {
                diag.with_help("allow backward moves or accept a larger period")
            }
            _ => diag,
        }
    }
}
