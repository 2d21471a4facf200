//! The mapped arrival model.

use super::{truth_mask, CutLeaf, CutOracle, MatchLibrary, SeqCut};
use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use crate::relax::{shifted, Arrival, ArrivalModel};
use kairos_common::Tolerance;
use kairos_ir::{NodeId, NodeKind, Polarity};

/// One gate input of a candidate.
#[derive(Clone, Debug)]
pub(crate) struct Pin {
    pub leaf: NodeId,
    pub phase: Polarity,
    pub latches: u32,
    pub delay: f64,
}

/// A library gate placed on one cut in one output phase.
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub gate: String,
    pub area: f64,
    pub cut: usize,
    pub pins: Vec<Pin>,
}

/// How an instance is implemented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Choice {
    /// Candidate index within the instance's phase.
    Match(usize),
    /// An inverter on the opposite phase.
    Inverter,
}

/// Arrival model over library matches of sequential cuts.
///
/// Candidates are computed once per node and phase when the model is
/// built. Relaxation then only evaluates them.
#[derive(Clone, Debug)]
pub struct MappedModel {
    cuts: Vec<Vec<SeqCut>>,
    candidates: Vec<[Vec<Candidate>; 2]>,
    inverter_delay: f64,
    inverter_area: f64,
    absorbs: bool,
    tolerance: Tolerance,
}

impl MappedModel {
    /// Enumerates cuts and matches for every AND node of `graph`.
    pub fn build(
        graph: &RetimeGraph,
        oracle: &dyn CutOracle,
        library: &dyn MatchLibrary,
        max_leaves: usize,
        tolerance: Tolerance,
    ) -> Result<Self, RetimeError> {
        let absorbs = library.absorbs_inverters();
        let inverter_delay = library.inverter_delay();
        if !absorbs && !(inverter_delay.is_finite() && inverter_delay > 0.0) {
            return Err(RetimeError::InvalidLibrary(format!(
                "inverter delay must be positive, got {inverter_delay}"
            )));
        }

        let n = graph.node_count();
        let mut model = Self {
            cuts: vec![Vec::new(); n],
            candidates: vec![[Vec::new(), Vec::new()]; n],
            inverter_delay,
            inverter_area: library.inverter_area(),
            absorbs,
            tolerance,
        };
        let phases: &[Polarity] = if absorbs {
            &[Polarity::Positive]
        } else {
            &Polarity::BOTH
        };

        for id in graph.node_ids() {
            if graph.kind(id) != NodeKind::And {
                continue;
            }
            for cut in oracle.cuts(id, max_leaves) {
                if is_trivial(&cut, id) {
                    continue;
                }
                check_cut(graph, id, &cut, max_leaves)?;
                let vars = cut.leaves.len();
                let index = model.cuts[id.index()].len();
                for &phase in phases {
                    let truth = if phase.is_negative() {
                        !cut.truth & cut.mask()
                    } else {
                        cut.truth & cut.mask()
                    };
                    for found in library.matches(truth, vars) {
                        let pins = pins_of(&cut.leaves, &found.pin_delays, found.leaf_phases, absorbs)
                            .map_err(|reason| {
                                RetimeError::InvalidLibrary(format!("gate {}: {reason}", found.gate))
                            })?;
                        model.candidates[id.index()][phase.index()].push(Candidate {
                            gate: found.gate,
                            area: found.area,
                            cut: index,
                            pins,
                        });
                    }
                }
                model.cuts[id.index()].push(cut);
            }

            let slots = &model.candidates[id.index()];
            let usable = if absorbs {
                !slots[0].is_empty()
            } else {
                slots.iter().any(|c| !c.is_empty())
            };
            if !usable {
                return Err(RetimeError::NoMatch {
                    node: graph.label(id),
                });
            }
        }
        Ok(model)
    }

    /// Returns `true` if the library absorbs inverters.
    pub fn absorbs_inverters(&self) -> bool {
        self.absorbs
    }

    /// Total number of candidates over all nodes and phases.
    pub fn candidate_count(&self) -> usize {
        self.candidates
            .iter()
            .map(|slots| slots[0].len() + slots[1].len())
            .sum()
    }

    pub(crate) fn inverter_area(&self) -> f64 {
        self.inverter_area
    }

    pub(crate) fn candidate(&self, node: NodeId, phase: usize, index: usize) -> &Candidate {
        &self.candidates[node.index()][phase][index]
    }

    pub(crate) fn cut(&self, node: NodeId, index: usize) -> &SeqCut {
        &self.cuts[node.index()][index]
    }

    /// Table slot used for a phase; everything is positive when inverters
    /// are absorbed.
    pub(crate) fn slot(&self, phase: Polarity) -> usize {
        if self.absorbs {
            0
        } else {
            phase.index()
        }
    }

    /// The inverter delay, or infinity if an inverter is slower than `period`.
    fn inverter_within(&self, period: f64) -> f64 {
        if self.tolerance.gt(self.inverter_delay, period) {
            f64::INFINITY
        } else {
            self.inverter_delay
        }
    }

    /// Best candidate arrival in one phase, with the candidate index.
    /// Candidates with a pin slower than `period` are skipped.
    fn best(&self, node: NodeId, phase: usize, period: f64, table: &[Arrival]) -> (f64, Option<usize>) {
        let eps = self.tolerance.epsilon();
        let mut best = (f64::INFINITY, None::<usize>);
        let mut best_area = f64::INFINITY;
        for (index, cand) in self.candidates[node.index()][phase].iter().enumerate() {
            if cand.pins.iter().any(|pin| self.tolerance.gt(pin.delay, period)) {
                continue;
            }
            let t = cand
                .pins
                .iter()
                .map(|pin| {
                    let at = table[pin.leaf.index()][self.slot(pin.phase)];
                    shifted(at, pin.latches as usize, period) + pin.delay
                })
                .fold(f64::NEG_INFINITY, f64::max);
            let tie = (t - best.0).abs() <= eps && cand.area < best_area;
            if t < best.0 - eps || tie || best.1.is_none() {
                best = (t, Some(index));
                best_area = cand.area;
            }
        }
        best
    }

    /// Picks the implementation of `(node, phase)` from a settled table.
    pub(crate) fn choose(
        &self,
        node: NodeId,
        phase: Polarity,
        period: f64,
        table: &[Arrival],
    ) -> Option<Choice> {
        let p = self.slot(phase);
        let (own, index) = self.best(node, p, period, table);
        if !self.absorbs {
            let (other, _) = self.best(node, 1 - p, period, table);
            if other + self.inverter_within(period) < own - self.tolerance.epsilon() {
                return Some(Choice::Inverter);
            }
        }
        index.map(Choice::Match)
    }
}

fn is_trivial(cut: &SeqCut, root: NodeId) -> bool {
    cut.leaves.len() == 1
        && cut.leaves[0]
            == CutLeaf {
                node: root,
                latches: 0,
            }
}

fn check_cut(graph: &RetimeGraph, root: NodeId, cut: &SeqCut, max_leaves: usize) -> Result<(), RetimeError> {
    let malformed = |reason: String| RetimeError::MalformedCut {
        node: graph.label(root),
        reason,
    };
    if cut.root != root {
        return Err(malformed(format!("cut is rooted at {}", cut.root)));
    }
    if cut.leaves.is_empty() || cut.leaves.len() > max_leaves.min(6) {
        return Err(malformed(format!("{} leaves", cut.leaves.len())));
    }
    for leaf in &cut.leaves {
        if leaf.node.index() >= graph.node_count() {
            return Err(malformed(format!("leaf {} does not exist", leaf.node)));
        }
        if graph.kind(leaf.node) == NodeKind::Output {
            return Err(malformed(format!("leaf {} is an output", graph.label(leaf.node))));
        }
    }
    if cut.truth & !truth_mask(cut.leaves.len()) != 0 {
        return Err(malformed("truth table has bits beyond its leaves".to_string()));
    }
    Ok(())
}

fn pins_of(leaves: &[CutLeaf], delays: &[f64], phases: u32, absorbs: bool) -> Result<Vec<Pin>, String> {
    if delays.len() != leaves.len() {
        return Err(format!("{} pin delays for {} inputs", delays.len(), leaves.len()));
    }
    leaves
        .iter()
        .zip(delays)
        .enumerate()
        .map(|(i, (leaf, &delay))| {
            if !(delay.is_finite() && delay > 0.0) {
                return Err(format!("pin {i} has delay {delay}"));
            }
            let negated = !absorbs && (phases >> i) & 1 == 1;
            Ok(Pin {
                leaf: leaf.node,
                phase: Polarity::from_complement(negated),
                latches: leaf.latches,
                delay,
            })
        })
        .collect()
}

impl ArrivalModel for MappedModel {
    fn source(&self, graph: &RetimeGraph, node: NodeId, period: f64) -> Arrival {
        match graph.kind(node) {
            NodeKind::Input if !self.absorbs => [0.0, self.inverter_within(period)],
            _ => [0.0, 0.0],
        }
    }

    fn arrival(&self, graph: &RetimeGraph, node: NodeId, period: f64, table: &[Arrival]) -> Arrival {
        if graph.kind(node) == NodeKind::Output {
            let edge = graph.edge(graph.fanin(node, 0));
            let slot = self.slot(Polarity::from_complement(edge.is_complemented()));
            let l = shifted(table[edge.driver().index()][slot], edge.latch_count(), period);
            return [l, l];
        }

        let own = [
            self.best(node, 0, period, table).0,
            self.best(node, 1, period, table).0,
        ];
        if self.absorbs {
            return [own[0], own[0]];
        }
        let mut out = own;
        for p in 0..2 {
            let via_inverter = own[1 - p] + self.inverter_within(period);
            if via_inverter < own[p] - self.tolerance.epsilon() {
                out[p] = via_inverter;
            }
        }
        out
    }
}
