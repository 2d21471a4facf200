//! Longest latch-free path: the clock period of a graph before retiming.

use crate::error::CycleError;
use crate::graph::CycleGraph;
use crate::ids::CycleNodeId;

/// Arrival times along latch-free paths.
#[derive(Debug, Clone)]
pub struct LongestPath {
    /// Arrival time at every node, indexed by node.
    pub arrival: Vec<f64>,
    /// The largest arrival time, or 0 for an empty graph.
    pub max: f64,
}

/// Computes, for every node, the longest delay of a path that ends at that
/// node and crosses no latch.
///
/// Every node may start a path (its inputs can come from latches), so
/// arrival times start at the node's own delay. Edges with latches are
/// skipped. Relaxation stops after at most one pass per node; a change on the
/// final pass means the latch-free edges form a cycle.
pub fn longest_path(graph: &CycleGraph) -> Result<LongestPath, CycleError> {
    let n = graph.node_count();
    let mut arrival: Vec<f64> = graph.nodes.iter().map(|node| node.delay).collect();

    for pass in 0..=n {
        let mut changed = None;
        for edge in graph.edges.iter().filter(|e| e.latches == 0) {
            let candidate = arrival[edge.from.index()] + graph.traversal_delay(edge);
            if candidate > arrival[edge.to.index()] {
                arrival[edge.to.index()] = candidate;
                changed = Some(edge.to);
            }
        }
        match changed {
            None => break,
            Some(node) if pass == n => return Err(CycleError::CombinationalCycle { node }),
            Some(_) => {}
        }
    }

    let max = arrival.iter().copied().fold(0.0_f64, f64::max);
    Ok(LongestPath { arrival, max })
}

impl LongestPath {
    /// Arrival time at one node.
    pub fn at(&self, node: CycleNodeId) -> f64 {
        self.arrival[node.index()]
    }
}
