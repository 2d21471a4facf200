//! The SAT seam used by legalization.
//!
//! [`SatSolver`] is the only thing legalization needs from a solver, so tests
//! can substitute a mock. [`VarisatSolver`] is the production implementation.

use crate::legal::Cnf;
use std::collections::HashSet;
use varisat::{CnfFormula, ExtendFormula, Lit, Solver, Var};

/// Result of one SAT call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SatOutcome {
    /// Satisfiable, with a value for every variable.
    Sat(Vec<bool>),
    /// Unsatisfiable.
    Unsat,
    /// The budget was exhausted before an answer.
    Timeout,
}

/// A solver failure unrelated to satisfiability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("solver failure: {0}")]
pub struct SatError(pub String);

/// A CNF satisfiability oracle with a resource budget.
pub trait SatSolver {
    /// Solves `cnf`. The budget is counted in clauses.
    fn solve(&mut self, cnf: &Cnf, budget: usize) -> Result<SatOutcome, SatError>;
}

/// Solver backed by the `varisat` CDCL engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct VarisatSolver;

impl SatSolver for VarisatSolver {
    fn solve(&mut self, cnf: &Cnf, budget: usize) -> Result<SatOutcome, SatError> {
        if cnf.clauses.len() > budget {
            return Ok(SatOutcome::Timeout);
        }

        let mut formula = CnfFormula::new();
        for clause in &cnf.clauses {
            let lits: Vec<Lit> = clause
                .iter()
                .map(|l| {
                    let var = Var::from_index(l.var as usize);
                    if l.negated {
                        Lit::negative(var)
                    } else {
                        Lit::positive(var)
                    }
                })
                .collect();
            formula.add_clause(&lits);
        }

        let mut solver = Solver::new();
        solver.add_formula(&formula);
        match solver.solve() {
            Ok(true) => {
                let model: HashSet<Lit> = solver.model().unwrap_or_default().into_iter().collect();
                let values = (0..cnf.num_vars)
                    .map(|i| model.contains(&Lit::positive(Var::from_index(i))))
                    .collect();
                Ok(SatOutcome::Sat(values))
            }
            Ok(false) => Ok(SatOutcome::Unsat),
            Err(e) => Err(SatError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legal::{LegalLit, LegalNet};

    #[test]
    fn solves_and_reads_model() {
        let mut net = LegalNet::new();
        let a = net.new_var();
        let b = net.new_var();
        let g = net.and(a, b);
        net.require(g, false);
        net.require(a, true);

        let cnf = net.to_cnf();
        match VarisatSolver.solve(&cnf, 1000).unwrap() {
            SatOutcome::Sat(model) => {
                assert!(net.value(a, &model));
                assert!(!net.value(b, &model));
                assert!(!net.value(g, &model));
                assert!(!net.value(LegalLit::FALSE, &model));
            }
            other => panic!("expected a model, got {other:?}"),
        }
    }

    #[test]
    fn detects_conflict() {
        let mut net = LegalNet::new();
        let a = net.new_var();
        net.require(a, true);
        net.require(a, false);
        assert_eq!(VarisatSolver.solve(&net.to_cnf(), 1000).unwrap(), SatOutcome::Unsat);
    }

    #[test]
    fn constant_assertion_conflict() {
        let mut net = LegalNet::new();
        net.require(LegalLit::FALSE, true);
        assert_eq!(VarisatSolver.solve(&net.to_cnf(), 1000).unwrap(), SatOutcome::Unsat);
    }

    #[test]
    fn budget_exhaustion_is_a_timeout() {
        let mut net = LegalNet::new();
        let a = net.new_var();
        net.require(a, true);
        assert_eq!(VarisatSolver.solve(&net.to_cnf(), 1).unwrap(), SatOutcome::Timeout);
    }
}
