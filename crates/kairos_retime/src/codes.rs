//! Diagnostic codes emitted by the retiming engine.

use kairos_diagnostics::{Category, DiagnosticCode};

/// The acyclic upper bound itself failed the feasibility test.
pub const INFEASIBLE_UPPER_BOUND: DiagnosticCode = DiagnosticCode::new(Category::Error, 1);
/// A scheduling pass made no progress with moves outstanding.
pub const SCHEDULE_STALL: DiagnosticCode = DiagnosticCode::new(Category::Error, 2);
/// The input network is malformed or has a combinational cycle.
pub const MALFORMED_NETWORK: DiagnosticCode = DiagnosticCode::new(Category::Error, 3);
/// Mapping-aware retiming could not be set up.
pub const MAPPING_FAILURE: DiagnosticCode = DiagnosticCode::new(Category::Error, 4);
/// An internal invariant broke.
pub const INTERNAL: DiagnosticCode = DiagnosticCode::new(Category::Error, 5);

/// Legalization was unsatisfiable; pending latches became don't-care.
pub const LEGALIZE_UNSAT: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);
/// Legalization ran out of budget; pending latches became don't-care.
pub const LEGALIZE_TIMEOUT: DiagnosticCode = DiagnosticCode::new(Category::Warning, 102);

/// The period search finished.
pub const PERIOD_FOUND: DiagnosticCode = DiagnosticCode::new(Category::Timing, 201);
/// A feasibility test exhausted its sweep budget.
pub const SWEEP_BUDGET: DiagnosticCode = DiagnosticCode::new(Category::Timing, 202);
/// The cycle-ratio lower bound seeded the search.
pub const CYCLE_BOUND: DiagnosticCode = DiagnosticCode::new(Category::Timing, 203);

/// Summary of one scheduling phase.
pub const SCHEDULE_SUMMARY: DiagnosticCode = DiagnosticCode::new(Category::Timing, 204);

/// Legalization solved the pending latches.
pub const LEGALIZE_SOLVED: DiagnosticCode = DiagnosticCode::new(Category::Legalize, 301);

/// Summary of the mapped cover.
pub const MAPPING_COVER: DiagnosticCode = DiagnosticCode::new(Category::Mapping, 401);
