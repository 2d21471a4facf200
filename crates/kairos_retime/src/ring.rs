//! Per-edge latch rings.
//!
//! A [`LatchRing`] stores the latches of one edge nearest-to-sink first in a
//! double-ended ring buffer, so both retiming directions push and pop in O(1).
//! The edge's latch count is the ring length, so the two can never disagree.

use crate::legal::LegalLit;
use kairos_common::InitValue;
use std::collections::VecDeque;

/// One virtual latch: a known initial value or a pending legalization literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Latch {
    /// A resolved value (`0`, `1` or don't-care).
    Known(InitValue),
    /// A value decided later by the legalization SAT call.
    Pending(LegalLit),
}

impl Latch {
    /// Builds a latch from a network initial value. `Unknown` reads as don't-care.
    pub fn from_init(value: InitValue) -> Self {
        match value {
            InitValue::Unknown => Latch::Known(InitValue::DontCare),
            v => Latch::Known(v),
        }
    }

    /// The initial value as seen by the network; pending latches report `Unknown`.
    pub fn init(self) -> InitValue {
        match self {
            Latch::Known(v) => v,
            Latch::Pending(_) => InitValue::Unknown,
        }
    }

    /// Applies an edge complementation bit.
    pub fn complement_if(self, complement: bool) -> Self {
        match self {
            Latch::Known(v) => Latch::Known(v.complement_if(complement)),
            Latch::Pending(lit) => Latch::Pending(lit.negate_if(complement)),
        }
    }

    /// Returns `true` for a pending latch.
    pub fn is_pending(self) -> bool {
        matches!(self, Latch::Pending(_))
    }
}

/// The ordered latches of one edge; the front is nearest the sink.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LatchRing {
    slots: VecDeque<Latch>,
}

impl LatchRing {
    /// Creates an empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ring from network values, nearest-to-sink first.
    pub fn from_values(values: &[InitValue]) -> Self {
        Self {
            slots: values.iter().copied().map(Latch::from_init).collect(),
        }
    }

    /// Number of latches on the edge.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the edge carries no latch.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The latch nearest the sink.
    pub fn front(&self) -> Option<Latch> {
        self.slots.front().copied()
    }

    /// The latch nearest the driver.
    pub fn back(&self) -> Option<Latch> {
        self.slots.back().copied()
    }

    /// Adds a latch next to the sink (backward retiming of the sink).
    pub fn push_front(&mut self, latch: Latch) {
        self.slots.push_front(latch);
    }

    /// Adds a latch next to the driver (forward retiming of the driver).
    pub fn push_back(&mut self, latch: Latch) {
        self.slots.push_back(latch);
    }

    /// Removes the latch next to the sink.
    pub fn pop_front(&mut self) -> Option<Latch> {
        self.slots.pop_front()
    }

    /// Removes the latch next to the driver.
    pub fn pop_back(&mut self) -> Option<Latch> {
        self.slots.pop_back()
    }

    /// Iterates nearest-to-sink first.
    pub fn iter(&self) -> impl Iterator<Item = Latch> + '_ {
        self.slots.iter().copied()
    }

    /// Mutable access to every slot, nearest-to-sink first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Latch> {
        self.slots.iter_mut()
    }

    /// The network view of the ring; pending latches appear as `Unknown`.
    pub fn values(&self) -> Vec<InitValue> {
        self.slots.iter().map(|l| l.init()).collect()
    }

    /// Number of pending latches.
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|l| l.is_pending()).count()
    }
}
