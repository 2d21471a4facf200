//! Selecting the instances the outputs depend on.

use super::arrival::{Choice, MappedModel};
use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use crate::relax::Arrival;
use kairos_ir::{NodeId, NodeKind, Polarity};
use std::collections::BTreeMap;

/// An implemented node phase: the node and its table slot.
pub(crate) type Instance = (NodeId, usize);

/// Walks back from the outputs and fixes a choice for every required
/// instance. Inputs needed in the negative phase get an inverter; the
/// constant never needs an instance.
pub(crate) fn cover(
    graph: &RetimeGraph,
    model: &MappedModel,
    table: &[Arrival],
    period: f64,
) -> Result<BTreeMap<Instance, Choice>, RetimeError> {
    let mut chosen = BTreeMap::new();
    let mut stack: Vec<Instance> = Vec::new();
    for id in graph.node_ids() {
        if graph.kind(id) == NodeKind::Output {
            let edge = graph.edge(graph.fanin(id, 0));
            let slot = model.slot(Polarity::from_complement(edge.is_complemented()));
            stack.push((edge.driver(), slot));
        }
    }

    while let Some((node, slot)) = stack.pop() {
        if chosen.contains_key(&(node, slot)) {
            continue;
        }
        match graph.kind(node) {
            NodeKind::Const => {}
            NodeKind::Input => {
                if slot == 1 {
                    chosen.insert((node, slot), Choice::Inverter);
                }
            }
            NodeKind::And => {
                let choice = model
                    .choose(node, Polarity::BOTH[slot], period, table)
                    .ok_or_else(|| RetimeError::NoMatch {
                        node: graph.label(node),
                    })?;
                chosen.insert((node, slot), choice);
                match choice {
                    Choice::Match(index) => {
                        for pin in &model.candidate(node, slot, index).pins {
                            stack.push((pin.leaf, model.slot(pin.phase)));
                        }
                    }
                    Choice::Inverter => stack.push((node, 1 - slot)),
                }
            }
            NodeKind::Output => {
                return Err(RetimeError::internal(format!(
                    "output {} used as a cut leaf",
                    graph.label(node)
                )));
            }
        }
    }
    Ok(chosen)
}
