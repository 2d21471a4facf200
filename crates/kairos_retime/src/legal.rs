//! The legalization network: a private AND graph of pending latch values.
//!
//! Backward retiming across a gate whose output latches hold concrete values
//! cannot always pick the new fanin values locally. Instead each new latch
//! becomes a fresh variable here, and the constraint "the gate evaluated on
//! these variables equals the removed value" is recorded as an assertion.
//! Forward moves over pending operands build AND nodes in the same graph.
//! After scheduling, the whole net is converted to CNF by the Tseitin
//! encoding and solved once.
//!
//! Node 0 is constant false, so [`LegalLit::FALSE`] and [`LegalLit::TRUE`]
//! are its two phases.

use crate::ring::Latch;
use kairos_common::InitValue;
use std::ops::Not;

/// A literal of the legalization network: a node and a negation flag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LegalLit {
    node: u32,
    negated: bool,
}

impl LegalLit {
    /// Constant false.
    pub const FALSE: LegalLit = LegalLit {
        node: 0,
        negated: false,
    };

    /// Constant true.
    pub const TRUE: LegalLit = LegalLit {
        node: 0,
        negated: true,
    };

    /// The node index the literal refers to.
    pub fn node(self) -> usize {
        self.node as usize
    }

    /// Returns `true` for a negated literal.
    pub fn is_negated(self) -> bool {
        self.negated
    }

    /// Returns `true` for either constant.
    pub fn is_const(self) -> bool {
        self.node == 0
    }

    /// Negates the literal when `negate` is set.
    pub fn negate_if(self, negate: bool) -> Self {
        Self {
            node: self.node,
            negated: self.negated ^ negate,
        }
    }
}

impl Not for LegalLit {
    type Output = Self;

    fn not(self) -> Self {
        self.negate_if(true)
    }
}

#[derive(Clone, Copy, Debug)]
enum LegalNode {
    False,
    Var,
    And(LegalLit, LegalLit),
}

/// One CNF literal: a variable index and its sign.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CnfLit {
    /// Variable index, `0..num_vars`.
    pub var: u32,
    /// `true` for the negative literal.
    pub negated: bool,
}

/// A formula in conjunctive normal form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cnf {
    /// Number of variables.
    pub num_vars: usize,
    /// The clauses, each a disjunction of literals.
    pub clauses: Vec<Vec<CnfLit>>,
}

/// The constraint network built during scheduling.
#[derive(Clone, Debug)]
pub struct LegalNet {
    nodes: Vec<LegalNode>,
    asserts: Vec<(LegalLit, bool)>,
    equalities: Vec<(LegalLit, LegalLit)>,
}

impl Default for LegalNet {
    fn default() -> Self {
        Self::new()
    }
}

impl LegalNet {
    /// Creates a network holding only the constant node.
    pub fn new() -> Self {
        Self {
            nodes: vec![LegalNode::False],
            asserts: Vec::new(),
            equalities: Vec::new(),
        }
    }

    /// Number of nodes including the constant.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing but the constant exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of recorded constraints.
    pub fn constraint_count(&self) -> usize {
        self.asserts.len() + self.equalities.len()
    }

    /// The constant literal for `value`.
    pub fn constant(value: bool) -> LegalLit {
        if value {
            LegalLit::TRUE
        } else {
            LegalLit::FALSE
        }
    }

    /// Allocates an unconstrained variable.
    pub fn new_var(&mut self) -> LegalLit {
        let node = self.nodes.len() as u32;
        self.nodes.push(LegalNode::Var);
        LegalLit {
            node,
            negated: false,
        }
    }

    /// Builds `a AND b`, folding constants and trivial cases.
    pub fn and(&mut self, a: LegalLit, b: LegalLit) -> LegalLit {
        if a == LegalLit::FALSE || b == LegalLit::FALSE || a == !b {
            return LegalLit::FALSE;
        }
        if a == LegalLit::TRUE || a == b {
            return b;
        }
        if b == LegalLit::TRUE {
            return a;
        }
        let node = self.nodes.len() as u32;
        self.nodes.push(LegalNode::And(a, b));
        LegalLit {
            node,
            negated: false,
        }
    }

    /// The literal standing for a latch value. Don't-care becomes a fresh
    /// variable, since any value is acceptable for it.
    pub fn lit_of(&mut self, latch: Latch) -> LegalLit {
        match latch {
            Latch::Known(InitValue::One) => LegalLit::TRUE,
            Latch::Known(InitValue::Zero) => LegalLit::FALSE,
            Latch::Known(_) => self.new_var(),
            Latch::Pending(lit) => lit,
        }
    }

    /// The latch standing for a literal; constants resolve immediately.
    pub fn latch_of(lit: LegalLit) -> Latch {
        if lit == LegalLit::TRUE {
            Latch::Known(InitValue::One)
        } else if lit == LegalLit::FALSE {
            Latch::Known(InitValue::Zero)
        } else {
            Latch::Pending(lit)
        }
    }

    /// Requires `lit` to take `value`.
    pub fn require(&mut self, lit: LegalLit, value: bool) {
        self.asserts.push((lit, value));
    }

    /// Requires `a` and `b` to take the same value.
    pub fn equate(&mut self, a: LegalLit, b: LegalLit) {
        if a != b {
            self.equalities.push((a, b));
        }
    }

    /// Tseitin encoding of every node and constraint. Variable `i` is node `i`.
    pub fn to_cnf(&self) -> Cnf {
        let lit = |l: LegalLit| CnfLit {
            var: l.node,
            negated: l.negated,
        };
        let mut clauses = Vec::with_capacity(self.nodes.len() * 3 + self.constraint_count());

        for (index, node) in self.nodes.iter().enumerate() {
            let z = LegalLit {
                node: index as u32,
                negated: false,
            };
            match *node {
                LegalNode::False => clauses.push(vec![lit(!z)]),
                LegalNode::Var => {}
                LegalNode::And(a, b) => {
                    clauses.push(vec![lit(!z), lit(a)]);
                    clauses.push(vec![lit(!z), lit(b)]);
                    clauses.push(vec![lit(z), lit(!a), lit(!b)]);
                }
            }
        }
        for &(l, value) in &self.asserts {
            clauses.push(vec![lit(l.negate_if(!value))]);
        }
        for &(a, b) in &self.equalities {
            clauses.push(vec![lit(!a), lit(b)]);
            clauses.push(vec![lit(a), lit(!b)]);
        }

        Cnf {
            num_vars: self.nodes.len(),
            clauses,
        }
    }

    /// The value of a literal under a model indexed by variable.
    pub fn value(&self, lit: LegalLit, model: &[bool]) -> bool {
        let raw = if lit.is_const() {
            false
        } else {
            model.get(lit.node()).copied().unwrap_or(false)
        };
        raw ^ lit.negated
    }
}
