//! Materializing a cover as a new retiming graph.
//!
//! Every instance becomes an AND node that computes the positive function
//! of its original node. A matched instance gets a private copy of the AND
//! cone between its root and the cut leaves, keyed by (node, latch offset)
//! so the latches inside the cone are copied exactly. An inverter instance
//! becomes a buffer `AND(inner, 1)`. Gate bindings record the library gate,
//! the phase it produces, and the phase each pin reads.
//!
//! Lags are assigned here too: a root takes the lag of its L-value, a cone
//! node at offset `k` takes the root lag plus `k`, and terminals keep 0.

use super::arrival::{Choice, MappedModel};
use super::cover::Instance;
use super::INVERTER_GATE;
use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use crate::relax::Arrival;
use crate::ring::LatchRing;
use crate::search::lag_from_arrival;
use kairos_common::Tolerance;
use kairos_ir::{GateBinding, NodeId, NodeKind, Polarity, Signal};
use std::collections::{BTreeMap, HashMap};

/// A materialized cover with its lags.
pub(crate) struct Materialized {
    pub graph: RetimeGraph,
    pub lags: Vec<Option<i32>>,
    pub area: f64,
}

struct Builder<'a> {
    source: &'a RetimeGraph,
    model: &'a MappedModel,
    out: RetimeGraph,
    lags: Vec<Option<i32>>,
    terminals: HashMap<NodeId, NodeId>,
    roots: BTreeMap<Instance, NodeId>,
}

impl Builder<'_> {
    fn node(&mut self, kind: NodeKind, name: Option<String>, lag: Option<i32>) -> NodeId {
        let id = self.out.add_node(kind, name);
        self.lags.push(lag);
        id
    }

    /// The materialized node carrying `leaf` as read in `phase`.
    fn signal(&self, leaf: NodeId, phase: Polarity) -> Result<NodeId, RetimeError> {
        let slot = self.model.slot(phase);
        let found = match self.source.kind(leaf) {
            NodeKind::Input if slot == 0 => self.terminals.get(&leaf),
            NodeKind::Const => self.terminals.get(&leaf),
            _ => self.roots.get(&(leaf, slot)),
        };
        found.copied().ok_or_else(|| {
            RetimeError::internal(format!(
                "no instance of {} in the {} phase",
                self.source.label(leaf),
                if slot == 0 { "positive" } else { "negative" }
            ))
        })
    }

    /// Copies the cone of `node` between `target` and the cut leaves.
    fn expand(&mut self, node: NodeId, slot: usize, index: usize, target: NodeId) -> Result<(), RetimeError> {
        let (source, model) = (self.source, self.model);
        let cand = model.candidate(node, slot, index);
        let cut = model.cut(node, cand.cut);
        let root_lag = self.lags[target.index()];
        let leaf_of: HashMap<(NodeId, u32), usize> = cut
            .leaves
            .iter()
            .enumerate()
            .map(|(i, leaf)| ((leaf.node, leaf.latches), i))
            .collect();
        let deepest = cut.leaves.iter().map(|l| l.latches).max().unwrap_or(0);

        let mut inside: HashMap<(NodeId, u32), NodeId> = HashMap::new();
        inside.insert((node, 0), target);
        let mut stack = vec![(node, 0u32, target)];

        while let Some((src, offset, sink)) = stack.pop() {
            for &e in source.fanins(src) {
                let edge = source.edge(e);
                let driver = edge.driver();
                let at = offset + edge.latch_count() as u32;
                let from = if let Some(&i) = leaf_of.get(&(driver, at)) {
                    let pin = &cand.pins[i];
                    self.signal(pin.leaf, pin.phase)?
                } else if source.is_const(driver) {
                    self.signal(driver, Polarity::Positive)?
                } else if source.kind(driver) != NodeKind::And || at > deepest {
                    return Err(RetimeError::MalformedCut {
                        node: source.label(node),
                        reason: format!(
                            "{} at offset {at} is neither a leaf nor inside the cone",
                            source.label(driver)
                        ),
                    });
                } else if let Some(&copy) = inside.get(&(driver, at)) {
                    copy
                } else {
                    let copy = self.node(NodeKind::And, None, root_lag.map(|l| l + at as i32));
                    inside.insert((driver, at), copy);
                    stack.push((driver, at, copy));
                    copy
                };
                self.out
                    .add_edge(from, sink, edge.is_complemented(), edge.ring().clone());
            }
        }
        Ok(())
    }
}

fn instance_name(graph: &RetimeGraph, node: NodeId, slot: usize) -> String {
    if slot == 0 {
        graph.label(node)
    } else {
        format!("{}_n", graph.label(node))
    }
}

/// Builds the mapped graph for a cover.
pub(crate) fn materialize(
    source: &RetimeGraph,
    model: &MappedModel,
    chosen: &BTreeMap<Instance, Choice>,
    table: &[Arrival],
    period: f64,
    tolerance: Tolerance,
) -> Result<Materialized, RetimeError> {
    let mut b = Builder {
        source,
        model,
        out: RetimeGraph::new(source.name()),
        lags: Vec::new(),
        terminals: HashMap::new(),
        roots: BTreeMap::new(),
    };

    // Step 1: terminals. All constants collapse into one.
    let one = b.node(NodeKind::Const, None, Some(0));
    for id in source.node_ids() {
        match source.kind(id) {
            NodeKind::Const => {
                b.terminals.insert(id, one);
            }
            NodeKind::Input => {
                let pi = b.node(NodeKind::Input, Some(source.label(id)), Some(0));
                b.terminals.insert(id, pi);
            }
            _ => {}
        }
    }

    // Step 2: one root per instance.
    for &(node, slot) in chosen.keys() {
        let lag = lag_from_arrival(table[node.index()][slot], period, tolerance);
        let root = b.node(NodeKind::And, Some(instance_name(source, node, slot)), lag);
        b.roots.insert((node, slot), root);
    }

    // Step 3: instance bodies and bindings.
    let mut area = 0.0;
    for (&(node, slot), &choice) in chosen {
        let root = b.roots[&(node, slot)];
        let phase = Polarity::BOTH[slot];
        match choice {
            Choice::Match(index) => {
                b.expand(node, slot, index, root)?;
                let cand = model.candidate(node, slot, index);
                let inputs = cand
                    .pins
                    .iter()
                    .map(|pin| {
                        b.signal(pin.leaf, pin.phase).map(|id| Signal {
                            node: id,
                            polarity: pin.phase,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                area += cand.area;
                b.out.set_binding(
                    root,
                    GateBinding {
                        gate: cand.gate.clone(),
                        output_phase: phase,
                        inputs,
                        area: cand.area,
                    },
                );
            }
            Choice::Inverter => {
                let inner = match source.kind(node) {
                    NodeKind::Input => b.signal(node, Polarity::Positive)?,
                    _ => b.signal(node, !phase)?,
                };
                b.out.add_edge(inner, root, false, LatchRing::new());
                b.out.add_edge(one, root, false, LatchRing::new());
                area += model.inverter_area();
                b.out.set_binding(
                    root,
                    GateBinding {
                        gate: INVERTER_GATE.to_string(),
                        output_phase: phase,
                        inputs: vec![Signal {
                            node: inner,
                            polarity: !phase,
                        }],
                        area: model.inverter_area(),
                    },
                );
            }
        }
    }

    // Step 4: outputs, reading the instance of the phase they need.
    for id in source.node_ids() {
        if source.kind(id) != NodeKind::Output {
            continue;
        }
        let edge = source.edge(source.fanin(id, 0));
        let from = b.signal(edge.driver(), Polarity::from_complement(edge.is_complemented()))?;
        let po = b.node(NodeKind::Output, Some(source.label(id)), Some(0));
        b.out
            .add_edge(from, po, edge.is_complemented(), edge.ring().clone());
    }

    Ok(Materialized {
        graph: b.out,
        lags: b.lags,
        area,
    })
}
