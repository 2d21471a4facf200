//! The two retiming primitives.
//!
//! A forward move takes the sink-side latch off every fanin of a gate and
//! puts one latch with the gate's value on every fanout. A backward move
//! does the reverse. Initial values follow the move:
//!
//! - forward, the new value is the AND-consensus of the removed fanin values
//!   after complementation, so it is always exact
//! - backward, values are chosen so that the gate evaluated on the new fanin
//!   latches reproduces every removed fanout value; when that cannot be
//!   decided locally the new latches become legalization variables
//!
//! Edges out of the constant node never receive latches. A latch-free edge
//! from the constant reads as `1` after complementation is applied.

use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use crate::legal::{LegalLit, LegalNet};
use crate::ring::Latch;
use kairos_common::InitValue;
use kairos_ir::{EdgeId, NodeId, NodeKind};
use serde::Serialize;
use std::fmt;

/// Direction of a latch move.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From fanins to fanouts.
    Forward,
    /// From fanouts to fanins.
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        })
    }
}

/// AND-consensus of two operands, building a legalization node when either
/// is pending.
fn consensus(a: Latch, b: Latch, legal: &mut LegalNet) -> Latch {
    match (a, b) {
        (Latch::Known(x), Latch::Known(y)) => Latch::Known(x & y),
        (Latch::Known(InitValue::Zero), _) | (_, Latch::Known(InitValue::Zero)) => {
            Latch::Known(InitValue::Zero)
        }
        _ => {
            let la = legal.lit_of(a);
            let lb = legal.lit_of(b);
            LegalNet::latch_of(legal.and(la, lb))
        }
    }
}

impl RetimeGraph {
    fn expect_gate(&self, node: NodeId) -> Result<(), RetimeError> {
        let kind = self.kind(node);
        if kind != NodeKind::And || self.fanins(node).len() != 2 {
            return Err(RetimeError::internal(format!(
                "cannot retime {} node {}",
                kind,
                self.label(node)
            )));
        }
        Ok(())
    }

    /// How many forward moves the node can make right now: the smallest
    /// latch count over its fanins, ignoring edges from the constant.
    pub fn forward_capacity(&self, node: NodeId) -> u32 {
        self.fanins(node)
            .iter()
            .map(|&e| self.edge(e))
            .filter(|edge| !self.is_const(edge.driver()))
            .map(|edge| edge.latch_count() as u32)
            .min()
            .unwrap_or(u32::MAX)
    }

    /// How many backward moves the node can make right now: the smallest
    /// latch count over its fanouts. A node without fanouts is unbounded.
    pub fn backward_capacity(&self, node: NodeId) -> u32 {
        self.fanouts(node)
            .iter()
            .map(|&e| self.edge(e).latch_count() as u32)
            .min()
            .unwrap_or(u32::MAX)
    }

    /// The value a constant fanin shows the gate at the current cycle.
    fn const_operand(&self, edge: EdgeId) -> Latch {
        let edge = self.edge(edge);
        edge.ring()
            .front()
            .unwrap_or(Latch::Known(InitValue::One))
            .complement_if(edge.is_complemented())
    }

    /// Moves one latch from every fanin of `node` to every fanout.
    pub fn retime_forward(&mut self, node: NodeId, legal: &mut LegalNet) -> Result<(), RetimeError> {
        self.expect_gate(node)?;
        if self.forward_capacity(node) == 0 {
            return Err(RetimeError::MoveUnavailable {
                node: self.label(node),
                direction: Direction::Forward,
            });
        }

        // Pop every fanin before pushing, so a self-loop hands its own
        // latch around.
        let mut operands = [Latch::Known(InitValue::One); 2];
        for (slot, e) in self.fanins(node).to_vec().into_iter().enumerate() {
            let edge = self.edge_mut(e);
            let latch = edge.ring.pop_front().unwrap_or(Latch::Known(InitValue::One));
            operands[slot] = latch.complement_if(edge.is_complemented());
        }
        let value = consensus(operands[0], operands[1], legal);

        for e in self.fanouts(node).to_vec() {
            self.edge_mut(e).ring.push_back(value);
        }
        Ok(())
    }

    /// Moves one latch from every fanout of `node` to every non-constant fanin.
    pub fn retime_backward(&mut self, node: NodeId, legal: &mut LegalNet) -> Result<(), RetimeError> {
        self.expect_gate(node)?;
        if self.backward_capacity(node) == 0 {
            return Err(RetimeError::MoveUnavailable {
                node: self.label(node),
                direction: Direction::Backward,
            });
        }

        let mut removed = Vec::with_capacity(self.fanouts(node).len());
        for e in self.fanouts(node).to_vec() {
            match self.edge_mut(e).ring.pop_back() {
                Some(latch) => removed.push(latch),
                None => return Err(RetimeError::internal("fanout ring emptied during a move")),
            }
        }

        let fanins = self.fanins(node).to_vec();
        let const_operands: Vec<Latch> = fanins
            .iter()
            .filter(|&&e| self.is_const(self.edge(e).driver()))
            .map(|&e| self.const_operand(e))
            .collect();
        let targets: Vec<(EdgeId, bool)> = fanins
            .iter()
            .filter(|&&e| !self.is_const(self.edge(e).driver()))
            .map(|&e| (e, self.edge(e).is_complemented()))
            .collect();

        let all_dont_care = removed
            .iter()
            .all(|&l| l == Latch::Known(InitValue::DontCare));
        let ones_only = removed
            .iter()
            .all(|&l| matches!(l, Latch::Known(InitValue::One | InitValue::DontCare)))
            && const_operands
                .iter()
                .all(|&l| l == Latch::Known(InitValue::One));

        if all_dont_care {
            for &(e, _) in &targets {
                self.edge_mut(e)
                    .ring
                    .push_front(Latch::Known(InitValue::DontCare));
            }
        } else if ones_only {
            for &(e, complement) in &targets {
                self.edge_mut(e)
                    .ring
                    .push_front(Latch::Known(InitValue::One.complement_if(complement)));
            }
        } else {
            let mut operands: Vec<LegalLit> = const_operands
                .into_iter()
                .map(|l| legal.lit_of(l))
                .collect();
            let mut fresh = Vec::with_capacity(targets.len());
            for &(e, complement) in &targets {
                let var = legal.new_var();
                fresh.push((e, var));
                operands.push(var.negate_if(complement));
            }
            let gate = operands
                .into_iter()
                .reduce(|a, b| legal.and(a, b))
                .unwrap_or(LegalLit::TRUE);

            for latch in removed {
                match latch {
                    Latch::Known(InitValue::Zero) => legal.require(gate, false),
                    Latch::Known(InitValue::One) => legal.require(gate, true),
                    Latch::Known(_) => {}
                    Latch::Pending(lit) => legal.equate(lit, gate),
                }
            }
            for (e, var) in fresh {
                self.edge_mut(e).ring.push_front(Latch::Pending(var));
            }
        }
        Ok(())
    }
}
