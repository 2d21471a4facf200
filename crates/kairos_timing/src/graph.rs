//! Timing graph data structures for cycle-ratio analysis.
//!
//! The [`CycleGraph`] is a directed graph whose nodes carry a gate delay and
//! whose edges carry an interconnect delay plus the number of latches on the
//! edge. The retiming engine builds one from its AND network (unit delay per
//! gate, zero per output terminal) to bound the feasible clock period.

use crate::ids::{CycleEdgeId, CycleNodeId};
use serde::{Deserialize, Serialize};

/// A timing graph for cycle-ratio analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleGraph {
    /// All nodes in the graph.
    pub nodes: Vec<CycleNode>,
    /// All directed edges in the graph.
    pub edges: Vec<CycleEdge>,
}

impl CycleGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with the given gate delay and returns its ID.
    pub fn add_node(&mut self, name: impl Into<String>, delay: f64) -> CycleNodeId {
        let id = CycleNodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(CycleNode {
            id,
            name: name.into(),
            delay,
        });
        id
    }

    /// Adds a directed edge and returns its ID.
    pub fn add_edge(
        &mut self,
        from: CycleNodeId,
        to: CycleNodeId,
        delay: f64,
        latches: u32,
    ) -> CycleEdgeId {
        let id = CycleEdgeId::from_raw(self.edges.len() as u32);
        self.edges.push(CycleEdge {
            id,
            from,
            to,
            delay,
            latches,
        });
        id
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: CycleNodeId) -> &CycleNode {
        &self.nodes[id.index()]
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: CycleEdgeId) -> &CycleEdge {
        &self.edges[id.as_raw() as usize]
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the outgoing edge IDs of every node, indexed by node.
    pub fn adjacency(&self) -> Vec<Vec<CycleEdgeId>> {
        let mut out = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            out[edge.from.index()].push(edge.id);
        }
        out
    }

    /// The cost of traversing an edge: its own delay plus the delay of the
    /// node it enters.
    pub fn traversal_delay(&self, edge: &CycleEdge) -> f64 {
        edge.delay + self.node(edge.to).delay
    }

    /// Total number of latches over all edges.
    pub fn latch_count(&self) -> u64 {
        self.edges.iter().map(|e| u64::from(e.latches)).sum()
    }
}

/// A node in the timing graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleNode {
    /// The unique ID of this node.
    pub id: CycleNodeId,
    /// Human-readable name.
    pub name: String,
    /// Delay through the node.
    pub delay: f64,
}

/// A directed edge in the timing graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleEdge {
    /// The unique ID of this edge.
    pub id: CycleEdgeId,
    /// The source node.
    pub from: CycleNodeId,
    /// The destination node.
    pub to: CycleNodeId,
    /// Interconnect delay along the edge.
    pub delay: f64,
    /// Number of latches on the edge.
    pub latches: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        let g = CycleGraph::new();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.latch_count(), 0);
    }

    #[test]
    fn add_nodes_and_edges() {
        let mut g = CycleGraph::new();
        let a = g.add_node("a", 1.0);
        let b = g.add_node("b", 2.5);
        let e = g.add_edge(a, b, 0.5, 2);
        assert_eq!(g.node(b).name, "b");
        assert_eq!(g.edge(e).latches, 2);
        assert_eq!(g.traversal_delay(g.edge(e)), 3.0);
        assert_eq!(g.adjacency()[a.index()], vec![e]);
        assert!(g.adjacency()[b.index()].is_empty());
        assert_eq!(g.latch_count(), 2);
    }

    #[test]
    fn serde_roundtrip() {
        let mut g = CycleGraph::new();
        let a = g.add_node("a", 1.0);
        g.add_edge(a, a, 0.0, 1);
        let json = serde_json::to_string(&g).unwrap();
        let back: CycleGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.edge_count(), 1);
    }
}
