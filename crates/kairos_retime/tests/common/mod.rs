//! Shared fixtures for the retiming integration tests: network builders, a
//! reference sequential cut enumerator, two gate libraries, and a
//! simulation-based comparison of a retimed network with its original.

#![allow(dead_code)]

use kairos_common::InitValue;
use kairos_ir::{NodeId, NodeKind, Polarity, SeqNetwork, Signal, Simulator};
use kairos_retime::{CutLeaf, CutOracle, GateMatch, MatchLibrary, SeqCut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Helper: network builders
// ---------------------------------------------------------------------------

/// `PI -> g1 -> ... -> gN -> PO`, each gate ANDed with the constant, and
/// `latches` on the output edge.
pub fn chain(gates: usize, latches: &[InitValue]) -> (SeqNetwork, Vec<NodeId>) {
    let mut net = SeqNetwork::new("chain");
    let one = net.add_const();
    let pi = net.add_input("pi");
    let mut prev = pi;
    let mut ids = Vec::with_capacity(gates);
    for i in 0..gates {
        let g = net.add_and(Signal::positive(prev), Signal::positive(one));
        net.set_name(g, format!("g{}", i + 1));
        ids.push(g);
        prev = g;
    }
    let po = net.add_output("po", Signal::positive(prev));
    for &v in latches {
        net.add_latch(po, 0, v);
    }
    (net, ids)
}

/// `g1 = AND(p0, p1)`, `gi = AND(g(i-1), pi)`, with `latches` on the output.
pub fn and_chain(gates: usize, latches: &[InitValue]) -> (SeqNetwork, Vec<NodeId>) {
    let mut net = SeqNetwork::new("and_chain");
    let pis: Vec<NodeId> = (0..=gates).map(|i| net.add_input(format!("p{i}"))).collect();
    let mut prev = pis[0];
    let mut ids = Vec::with_capacity(gates);
    for i in 0..gates {
        let g = net.add_and(Signal::positive(prev), Signal::positive(pis[i + 1]));
        net.set_name(g, format!("g{}", i + 1));
        ids.push(g);
        prev = g;
    }
    let po = net.add_output("po", Signal::positive(prev));
    for &v in latches {
        net.add_latch(po, 0, v);
    }
    (net, ids)
}

/// Two gates in a loop closed by one latch: `a = AND(pi, b')`, `b = AND(a, pi)`.
pub fn two_gate_loop(init: InitValue) -> (SeqNetwork, [NodeId; 2]) {
    let mut net = SeqNetwork::new("loop");
    let pi = net.add_input("pi");
    let a = net.add_and(Signal::positive(pi), Signal::positive(pi));
    let b = net.add_and(Signal::positive(a), Signal::positive(pi));
    net.set_fanin(a, 1, Signal::negative(b));
    net.add_latch(a, 1, init);
    net.set_name(a, "a");
    net.set_name(b, "b");
    net.add_output("po", Signal::positive(b));
    (net, [a, b])
}

/// A random network of `gates` AND nodes over `inputs` inputs.
///
/// Gates read earlier nodes, possibly through latches, and every feedback
/// edge (reading a later gate) carries at least one latch. Latch values are
/// drawn from `values`; edges are complemented with probability `complement`.
pub fn random_network(
    seed: u64,
    inputs: usize,
    gates: usize,
    outputs: usize,
    values: &[InitValue],
    complement: f64,
) -> SeqNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut net = SeqNetwork::new(format!("random{seed}"));
    let mut pool: Vec<NodeId> = (0..inputs)
        .map(|i| net.add_input(format!("pi{i}")))
        .collect();

    let first = pool[0];
    let ids: Vec<NodeId> = (0..gates)
        .map(|_| net.add_and(Signal::positive(first), Signal::positive(first)))
        .collect();

    for (k, &g) in ids.iter().enumerate() {
        for pin in 0..2 {
            let feedback = rng.gen_bool(0.15);
            let driver = if feedback {
                ids[rng.gen_range(k..gates)]
            } else {
                pool[rng.gen_range(0..pool.len())]
            };
            let signal = Signal {
                node: driver,
                polarity: Polarity::from_complement(rng.gen_bool(complement)),
            };
            net.set_fanin(g, pin, signal);
            let count = if feedback {
                rng.gen_range(1..=2)
            } else if rng.gen_bool(0.25) {
                1
            } else {
                0
            };
            for _ in 0..count {
                net.add_latch(g, pin, values[rng.gen_range(0..values.len())]);
            }
        }
        pool.push(g);
    }

    for i in 0..outputs {
        let driver = ids[gates - 1 - (i % gates)];
        let po = net.add_output(format!("po{i}"), Signal::positive(driver));
        if rng.gen_bool(0.5) {
            net.add_latch(po, 0, values[rng.gen_range(0..values.len())]);
        }
    }
    net
}

/// Random concrete input vectors.
pub fn stimulus(seed: u64, inputs: usize, cycles: usize) -> Vec<Vec<InitValue>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..cycles)
        .map(|_| {
            (0..inputs)
                .map(|_| InitValue::from_bool(rng.gen_bool(0.5)))
                .collect()
        })
        .collect()
}

/// Checks that every concrete output value of `original` is reproduced by
/// `retimed` under the same stimulus.
pub fn assert_refines(original: &SeqNetwork, retimed: &SeqNetwork, seed: u64, cycles: usize) {
    let stim = stimulus(seed, original.inputs().len(), cycles);
    let expected = Simulator::new(original).unwrap().run(&stim);
    let observed = Simulator::new(retimed).unwrap().run(&stim);
    for (cycle, (want, got)) in expected.iter().zip(&observed).enumerate() {
        for (port, (w, g)) in want.iter().zip(got).enumerate() {
            assert!(
                w.admits(*g),
                "cycle {cycle} output {port}: expected {w:?}, got {g:?}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Helper: reference sequential cut enumerator
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Fanin {
    driver: NodeId,
    complement: bool,
    latches: u32,
}

/// Enumerates sequential cuts by repeatedly expanding AND leaves into their
/// fanins, adding the edge's latch count to the leaf offset. Constant
/// fanins never become leaves.
pub struct SeqCuts {
    kinds: Vec<NodeKind>,
    fanins: Vec<Vec<Fanin>>,
    max_offset: u32,
    max_cuts: usize,
}

type LeafSet = BTreeSet<(NodeId, u32)>;

impl SeqCuts {
    /// Snapshots `network`. Node IDs match those of the retiming graph.
    pub fn new(network: &SeqNetwork) -> Self {
        let mut kinds = Vec::new();
        let mut fanins = Vec::new();
        for (_, node) in network.nodes() {
            kinds.push(node.kind);
            fanins.push(
                node.fanins
                    .iter()
                    .map(|f| Fanin {
                        driver: f.signal.node,
                        complement: f.signal.polarity.is_negative(),
                        latches: f.latches.len() as u32,
                    })
                    .collect(),
            );
        }
        Self {
            kinds,
            fanins,
            max_offset: 2,
            max_cuts: 64,
        }
    }

    fn expand(&self, set: &LeafSet, leaf: (NodeId, u32)) -> Option<LeafSet> {
        let (node, offset) = leaf;
        if self.kinds[node.index()] != NodeKind::And {
            return None;
        }
        let mut next = set.clone();
        next.remove(&leaf);
        for f in &self.fanins[node.index()] {
            if self.kinds[f.driver.index()] == NodeKind::Const {
                continue;
            }
            let at = offset + f.latches;
            if at > self.max_offset {
                return None;
            }
            next.insert((f.driver, at));
        }
        Some(next)
    }

    /// Value of `(node, offset)` inside the cone for one leaf assignment.
    fn eval(&self, node: NodeId, offset: u32, leaves: &[(NodeId, u32)], minterm: u64) -> bool {
        if let Some(i) = leaves.iter().position(|&l| l == (node, offset)) {
            return (minterm >> i) & 1 == 1;
        }
        match self.kinds[node.index()] {
            NodeKind::Const => true,
            _ => self.fanins[node.index()].iter().all(|f| {
                let v = self.eval(f.driver, offset + f.latches, leaves, minterm);
                v != f.complement
            }),
        }
    }

    fn truth(&self, root: NodeId, leaves: &[(NodeId, u32)]) -> u64 {
        let mut truth = 0u64;
        for m in 0..(1u64 << leaves.len()) {
            if self.eval(root, 0, leaves, m) {
                truth |= 1 << m;
            }
        }
        truth
    }
}

impl CutOracle for SeqCuts {
    fn cuts(&self, node: NodeId, max_leaves: usize) -> Box<dyn Iterator<Item = SeqCut> + '_> {
        let start: LeafSet = [(node, 0)].into_iter().collect();
        let mut seen: BTreeSet<LeafSet> = BTreeSet::new();
        let mut frontier = vec![start.clone()];
        seen.insert(start);

        while let Some(set) = frontier.pop() {
            if seen.len() >= self.max_cuts {
                break;
            }
            for &leaf in &set {
                if let Some(next) = self.expand(&set, leaf) {
                    if !next.is_empty() && next.len() <= max_leaves && seen.insert(next.clone()) {
                        frontier.push(next);
                    }
                }
            }
        }

        let cuts: Vec<SeqCut> = seen
            .into_iter()
            .map(|set| {
                let leaves: Vec<(NodeId, u32)> = set.into_iter().collect();
                SeqCut {
                    root: node,
                    truth: self.truth(node, &leaves),
                    leaves: leaves
                        .iter()
                        .map(|&(node, latches)| CutLeaf { node, latches })
                        .collect(),
                }
            })
            .collect();
        Box::new(cuts.into_iter())
    }
}

// ---------------------------------------------------------------------------
// Helper: libraries
// ---------------------------------------------------------------------------

/// K-input lookup tables: any function, unit delay, free inverters.
pub struct LutLibrary {
    pub k: usize,
}

impl MatchLibrary for LutLibrary {
    fn matches(&self, _truth: u64, vars: usize) -> Vec<GateMatch> {
        if vars == 0 || vars > self.k {
            return Vec::new();
        }
        vec![GateMatch {
            gate: format!("LUT{vars}"),
            area: 1.0,
            pin_delays: vec![1.0; vars],
            leaf_phases: 0,
        }]
    }

    fn inverter_delay(&self) -> f64 {
        0.0
    }

    fn absorbs_inverters(&self) -> bool {
        true
    }
}

/// A few standard cells: BUF, AND2 with optional inverted inputs, NAND2.
pub struct CellLibrary {
    pub and_delay: f64,
    pub nand_delay: f64,
    pub inverter_delay: f64,
}

impl Default for CellLibrary {
    fn default() -> Self {
        Self {
            and_delay: 1.0,
            nand_delay: 0.8,
            inverter_delay: 0.5,
        }
    }
}

/// Truth table of `AND(x0 ^ p0, x1 ^ p1)` over two variables.
fn and2_truth(phases: u32) -> u64 {
    let mut truth = 0;
    for m in 0..4u32 {
        let x0 = (m & 1 == 1) != (phases & 1 == 1);
        let x1 = (m & 2 == 2) != (phases & 2 == 2);
        if x0 && x1 {
            truth |= 1 << m;
        }
    }
    truth
}

impl MatchLibrary for CellLibrary {
    fn matches(&self, truth: u64, vars: usize) -> Vec<GateMatch> {
        let mut found = Vec::new();
        match vars {
            1 if truth == 0b10 => found.push(GateMatch {
                gate: "BUF".to_string(),
                area: 1.0,
                pin_delays: vec![self.and_delay],
                leaf_phases: 0,
            }),
            1 if truth == 0b01 => found.push(GateMatch {
                gate: "INV".to_string(),
                area: 0.5,
                pin_delays: vec![self.inverter_delay],
                leaf_phases: 0,
            }),
            2 => {
                for phases in 0..4 {
                    if truth == and2_truth(phases) {
                        found.push(GateMatch {
                            gate: "AND2".to_string(),
                            area: 2.0,
                            pin_delays: vec![self.and_delay; 2],
                            leaf_phases: phases,
                        });
                    }
                }
                if truth == !and2_truth(0) & 0xF {
                    found.push(GateMatch {
                        gate: "NAND2".to_string(),
                        area: 1.5,
                        pin_delays: vec![self.nand_delay; 2],
                        leaf_phases: 0,
                    });
                }
            }
            _ => {}
        }
        found
    }

    fn inverter_delay(&self) -> f64 {
        self.inverter_delay
    }

    fn inverter_area(&self) -> f64 {
        0.5
    }
}
