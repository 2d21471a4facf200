//! Mapping-aware retiming.
//!
//! Here the delay of a node depends on how it would be implemented. A
//! [`CutOracle`] enumerates sequential cuts of each AND node: leaf sets that
//! may sit behind latches, each leaf tagged with the latch count between it
//! and the root. A [`MatchLibrary`] says which gates implement the cut
//! function and at what pin delays. Relaxation then computes one L-value
//! per node and output phase: the best match over all cuts, or the opposite
//! phase plus an inverter.
//!
//! After the period search, [`cover`] picks the instances the outputs need
//! and [`collect`] materializes them as a fresh graph whose AND cones copy
//! the covered logic, with each root bound to its gate.

mod arrival;
mod collect;
mod cover;

pub use arrival::MappedModel;
pub(crate) use collect::materialize;
pub(crate) use cover::cover;

use kairos_ir::NodeId;

/// One leaf of a sequential cut.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CutLeaf {
    /// The leaf node.
    pub node: NodeId,
    /// Latches between the leaf and the root along the cut.
    pub latches: u32,
}

/// A sequential cut rooted at an AND node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeqCut {
    /// The root.
    pub root: NodeId,
    /// Leaves; leaf `i` is truth-table variable `i`.
    pub leaves: Vec<CutLeaf>,
    /// Truth table of the root over the leaves, bit `m` for minterm `m`.
    pub truth: u64,
}

impl SeqCut {
    /// Mask of the valid truth-table bits.
    pub fn mask(&self) -> u64 {
        truth_mask(self.leaves.len())
    }
}

/// Mask of the valid truth-table bits for `vars` variables.
pub fn truth_mask(vars: usize) -> u64 {
    if vars >= 6 {
        u64::MAX
    } else {
        (1u64 << (1u32 << vars)) - 1
    }
}

/// Enumerates sequential cuts.
pub trait CutOracle {
    /// Cuts of `node` with at most `max_leaves` leaves. The trivial cut
    /// (the node itself) may be included; it is ignored.
    fn cuts(&self, node: NodeId, max_leaves: usize) -> Box<dyn Iterator<Item = SeqCut> + '_>;
}

/// A library gate implementing a cut function.
#[derive(Clone, Debug, PartialEq)]
pub struct GateMatch {
    /// Gate name.
    pub gate: String,
    /// Gate area.
    pub area: f64,
    /// Delay from each pin to the output, in leaf order. All positive.
    pub pin_delays: Vec<f64>,
    /// Bit `i` set: pin `i` reads leaf `i` complemented.
    pub leaf_phases: u32,
}

/// A gate library queried by truth table.
pub trait MatchLibrary {
    /// Gates implementing `truth` over `vars` inputs.
    fn matches(&self, truth: u64, vars: usize) -> Vec<GateMatch>;

    /// Delay of an inverter.
    fn inverter_delay(&self) -> f64;

    /// Area of an inverter.
    fn inverter_area(&self) -> f64 {
        0.0
    }

    /// Returns `true` if every gate can take any input or output phase for
    /// free (as with lookup tables). Only the positive phase is then used.
    fn absorbs_inverters(&self) -> bool {
        false
    }
}

/// Gate name bound to inserted inverters.
pub const INVERTER_GATE: &str = "INV";
