//! Resolving pending latches with one SAT call.
//!
//! If nothing is pending no solver runs. Otherwise the legalization network
//! goes to the solver under the configured clause budget. A model writes
//! concrete values into every pending latch. An unsatisfiable or exhausted
//! call, or a run with legalization switched off, turns the pending latches
//! into don't-cares and marks the initial state inexact; the retimed
//! structure is kept either way.

use crate::codes;
use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use crate::legal::LegalNet;
use crate::ring::Latch;
use crate::sat::{SatOutcome, SatSolver};
use kairos_common::InitValue;
use kairos_diagnostics::{Diagnostic, DiagnosticSink};
use serde::Serialize;

/// How the pending latches were resolved.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalizeOutcome {
    /// No latch was pending.
    #[default]
    NotNeeded,
    /// The solver found consistent values.
    Solved,
    /// The constraints were contradictory.
    Unsat,
    /// The solver ran out of budget.
    Timeout,
    /// Legalization was switched off.
    Disabled,
}

impl LegalizeOutcome {
    /// Returns `true` if the initial state is exactly equivalent.
    pub fn is_exact(self) -> bool {
        matches!(self, LegalizeOutcome::NotNeeded | LegalizeOutcome::Solved)
    }
}

fn release_pending(graph: &mut RetimeGraph) {
    for latch in graph.latches_mut() {
        if latch.is_pending() {
            *latch = Latch::Known(InitValue::DontCare);
        }
    }
}

/// Resolves every pending latch of `graph`.
///
/// `solver` is `None` when legalization is disabled.
pub fn legalize(
    graph: &mut RetimeGraph,
    legal: &LegalNet,
    solver: Option<&mut dyn SatSolver>,
    clause_budget: usize,
    sink: &DiagnosticSink,
) -> Result<LegalizeOutcome, RetimeError> {
    let pending = graph.pending_count();
    if pending == 0 {
        return Ok(LegalizeOutcome::NotNeeded);
    }
    let Some(solver) = solver else {
        release_pending(graph);
        return Ok(LegalizeOutcome::Disabled);
    };

    let cnf = legal.to_cnf();
    match solver.solve(&cnf, clause_budget)? {
        SatOutcome::Sat(model) => {
            for latch in graph.latches_mut() {
                if let Latch::Pending(lit) = *latch {
                    *latch = Latch::Known(InitValue::from_bool(legal.value(lit, &model)));
                }
            }
            sink.emit(Diagnostic::note(
                codes::LEGALIZE_SOLVED,
                format!(
                    "{pending} pending latches solved from {} variables and {} clauses",
                    cnf.num_vars,
                    cnf.clauses.len()
                ),
            ));
            Ok(LegalizeOutcome::Solved)
        }
        SatOutcome::Unsat => {
            release_pending(graph);
            sink.emit(
                Diagnostic::warning(
                    codes::LEGALIZE_UNSAT,
                    format!("initial values of {pending} retimed latches are contradictory"),
                )
                .with_note("the affected latches are left as don't-care"),
            );
            Ok(LegalizeOutcome::Unsat)
        }
        SatOutcome::Timeout => {
            release_pending(graph);
            sink.emit(
                Diagnostic::warning(
                    codes::LEGALIZE_TIMEOUT,
                    format!(
                        "legalization of {pending} latches exceeded the budget of {clause_budget} clauses"
                    ),
                )
                .with_note("the affected latches are left as don't-care")
                .with_help("raise `legalize.sat_clause_budget`"),
            );
            Ok(LegalizeOutcome::Timeout)
        }
    }
}
