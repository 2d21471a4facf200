//! Turning a lag vector into a legal sequence of single moves.
//!
//! Moves run in passes. In each pass every node with moves left makes as
//! many as its current latches allow. All forward moves complete before any
//! backward move. A legal lag vector never stalls; a pass with no progress
//! therefore means the lags were wrong, and is reported rather than
//! repaired.

use crate::codes;
use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use crate::legal::LegalNet;
use crate::moves::Direction;
use kairos_diagnostics::{Diagnostic, DiagnosticSink};
use kairos_ir::{NodeId, NodeKind};
use serde::Serialize;

/// Moves owed per node, split by direction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovePlan {
    /// Nodes with a negative lag and the number of forward moves they owe.
    pub forward: Vec<(NodeId, u32)>,
    /// Nodes with a positive lag and the number of backward moves they owe.
    pub backward: Vec<(NodeId, u32)>,
}

impl MovePlan {
    /// Builds the plan for a lag vector indexed by node. Only AND gates move.
    pub fn from_lags(graph: &RetimeGraph, lags: &[i32]) -> Self {
        let mut plan = Self::default();
        for id in graph.node_ids() {
            if graph.kind(id) != NodeKind::And {
                continue;
            }
            let lag = lags[id.index()];
            if lag < 0 {
                plan.forward.push((id, lag.unsigned_abs()));
            } else if lag > 0 {
                plan.backward.push((id, lag as u32));
            }
        }
        plan
    }

    /// Returns `true` if no node moves.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.backward.is_empty()
    }

    /// Total number of single moves.
    pub fn total(&self) -> u64 {
        self.forward
            .iter()
            .chain(&self.backward)
            .map(|&(_, n)| u64::from(n))
            .sum()
    }
}

/// Counters from one scheduling phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhaseStats {
    /// Single moves performed.
    pub moves: u64,
    /// Passes over the outstanding nodes.
    pub passes: u32,
}

/// Performs every move of one direction.
pub fn run_moves(
    graph: &mut RetimeGraph,
    legal: &mut LegalNet,
    work: &[(NodeId, u32)],
    direction: Direction,
    sink: &DiagnosticSink,
) -> Result<PhaseStats, RetimeError> {
    let mut owed: Vec<(NodeId, u32)> = work.iter().copied().filter(|&(_, n)| n > 0).collect();
    let mut stats = PhaseStats::default();

    while !owed.is_empty() {
        stats.passes += 1;
        let mut progress = false;
        for (node, left) in owed.iter_mut() {
            let capacity = match direction {
                Direction::Forward => graph.forward_capacity(*node),
                Direction::Backward => graph.backward_capacity(*node),
            };
            let now = capacity.min(*left);
            for _ in 0..now {
                match direction {
                    Direction::Forward => graph.retime_forward(*node, legal)?,
                    Direction::Backward => graph.retime_backward(*node, legal)?,
                }
            }
            if now > 0 {
                *left -= now;
                stats.moves += u64::from(now);
                progress = true;
            }
        }
        owed.retain(|&(_, left)| left > 0);

        if !progress {
            let remaining = owed.iter().map(|&(_, n)| u64::from(n)).sum();
            let nodes: Vec<String> = owed.iter().map(|&(id, _)| graph.label(id)).collect();
            let err = RetimeError::ScheduleStall {
                direction,
                remaining,
                nodes,
            };
            sink.emit(err.to_diagnostic());
            return Err(err);
        }
    }

    if stats.moves > 0 {
        sink.emit(Diagnostic::note(
            codes::SCHEDULE_SUMMARY,
            format!(
                "{} {direction} moves in {} passes",
                stats.moves, stats.passes
            ),
        ));
    }
    Ok(stats)
}
