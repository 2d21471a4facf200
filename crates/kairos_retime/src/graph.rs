//! The retiming graph: a mutable edge-centric view of a [`SeqNetwork`].
//!
//! Every fanin of the input network becomes an [`Edge`] that owns its latch
//! ring and knows its driver, sink, and complement flag. Nodes keep their
//! fanin edges in pin order and their fanout edges in creation order, so
//! both move directions and the sharing pass touch only local data. Node
//! IDs match the network the graph was built from; nodes added later (the
//! sharing buffers, a materialized mapping) are appended.

use crate::error::RetimeError;
use crate::ring::{Latch, LatchRing};
use kairos_ir::{
    Arena, EdgeId, Fanin, GateBinding, Node, NodeId, NodeKind, Polarity, SeqNetwork, Signal,
};
use kairos_timing::{CycleGraph, CycleNodeId};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

/// A node of the retiming graph.
#[derive(Clone, Debug)]
pub struct GraphNode {
    kind: NodeKind,
    name: Option<String>,
    fanins: Vec<EdgeId>,
    fanouts: Vec<EdgeId>,
    binding: Option<GateBinding>,
}

/// A fanin edge with its latch ring.
#[derive(Clone, Debug)]
pub struct Edge {
    driver: NodeId,
    sink: NodeId,
    complement: bool,
    pub(crate) ring: LatchRing,
}

impl Edge {
    /// The driving node.
    pub fn driver(&self) -> NodeId {
        self.driver
    }

    /// The reading node.
    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Returns `true` if the sink reads the complement of the driver.
    pub fn is_complemented(&self) -> bool {
        self.complement
    }

    /// The latches on the edge, nearest the sink first.
    pub fn ring(&self) -> &LatchRing {
        &self.ring
    }

    /// Number of latches on the edge.
    pub fn latch_count(&self) -> usize {
        self.ring.len()
    }
}

/// The graph that retiming moves, legalization, and sharing operate on.
#[derive(Clone, Debug, Default)]
pub struct RetimeGraph {
    name: String,
    nodes: Arena<NodeId, GraphNode>,
    edges: Arena<EdgeId, Edge>,
    constant: Option<NodeId>,
}

impl RetimeGraph {
    /// Creates an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builds the graph from a validated network, preserving node IDs.
    pub fn from_network(network: &SeqNetwork) -> Result<Self, RetimeError> {
        network.validate()?;

        let mut graph = Self::new(network.name.clone());
        for (id, node) in network.nodes() {
            let added = graph.add_node(node.kind, node.name.clone());
            debug_assert_eq!(added, id);
            graph.nodes[added].binding = node.binding.clone();
        }
        for (id, node) in network.nodes() {
            for fanin in &node.fanins {
                graph.add_edge(
                    fanin.signal.node,
                    id,
                    fanin.signal.is_complemented(),
                    LatchRing::from_values(&fanin.latches),
                );
            }
        }
        Ok(graph)
    }

    /// Converts back to a network with the same node IDs.
    ///
    /// Fails if any latch is still pending legalization.
    pub fn to_network(&self) -> Result<SeqNetwork, RetimeError> {
        let mut network = SeqNetwork::new(self.name.clone());
        for (id, node) in self.nodes.iter() {
            let mut fanins = Vec::with_capacity(node.fanins.len());
            for &e in &node.fanins {
                let edge = &self.edges[e];
                if edge.ring.pending() > 0 {
                    return Err(RetimeError::internal(format!(
                        "edge {} into {} still holds pending latches",
                        e,
                        self.label(id)
                    )));
                }
                let signal = Signal {
                    node: edge.driver,
                    polarity: Polarity::from_complement(edge.complement),
                };
                fanins.push(Fanin::with_latches(signal, edge.ring.values()));
            }
            let mut out = Node::new(node.kind, fanins);
            out.name = node.name.clone();
            out.binding = node.binding.clone();
            network.add_node(out);
        }
        Ok(network)
    }

    /// Appends a node without edges.
    pub fn add_node(&mut self, kind: NodeKind, name: Option<String>) -> NodeId {
        let id = self.nodes.alloc(GraphNode {
            kind,
            name,
            fanins: Vec::new(),
            fanouts: Vec::new(),
            binding: None,
        });
        if kind == NodeKind::Const && self.constant.is_none() {
            self.constant = Some(id);
        }
        id
    }

    /// Appends an edge as the next fanin pin of `sink`.
    pub fn add_edge(
        &mut self,
        driver: NodeId,
        sink: NodeId,
        complement: bool,
        ring: LatchRing,
    ) -> EdgeId {
        let id = self.edges.alloc(Edge {
            driver,
            sink,
            complement,
            ring,
        });
        self.nodes[sink].fanins.push(id);
        self.nodes[driver].fanouts.push(id);
        id
    }

    /// The constant node, created on first use.
    pub fn constant(&mut self) -> NodeId {
        match self.constant {
            Some(id) => id,
            None => self.add_node(NodeKind::Const, None),
        }
    }

    /// Moves the driver end of an edge to another node.
    pub fn redirect_driver(&mut self, edge: EdgeId, driver: NodeId) {
        let old = self.edges[edge].driver;
        self.nodes[old].fanouts.retain(|&e| e != edge);
        self.nodes[driver].fanouts.push(edge);
        self.edges[edge].driver = driver;
    }

    /// Attaches a gate binding to a node.
    pub fn set_binding(&mut self, node: NodeId, binding: GateBinding) {
        self.nodes[node].binding = Some(binding);
    }

    /// The network name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All node IDs in order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.ids()
    }

    /// All edge IDs in order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.ids()
    }

    /// The kind of a node.
    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node].kind
    }

    /// Returns `true` for the constant node.
    pub fn is_const(&self, node: NodeId) -> bool {
        self.nodes[node].kind == NodeKind::Const
    }

    /// The gate binding of a node, if mapped.
    pub fn binding(&self, node: NodeId) -> Option<&GateBinding> {
        self.nodes[node].binding.as_ref()
    }

    /// Fanin edges in pin order.
    pub fn fanins(&self, node: NodeId) -> &[EdgeId] {
        &self.nodes[node].fanins
    }

    /// Fanout edges.
    pub fn fanouts(&self, node: NodeId) -> &[EdgeId] {
        &self.nodes[node].fanouts
    }

    /// The fanin edge on a given pin.
    pub fn fanin(&self, node: NodeId, pin: usize) -> EdgeId {
        self.nodes[node].fanins[pin]
    }

    /// An edge by ID.
    pub fn edge(&self, edge: EdgeId) -> &Edge {
        &self.edges[edge]
    }

    pub(crate) fn edge_mut(&mut self, edge: EdgeId) -> &mut Edge {
        &mut self.edges[edge]
    }

    /// Total latches over all edges.
    pub fn latch_count(&self) -> usize {
        self.edges.values().map(Edge::latch_count).sum()
    }

    /// Number of latches still pending legalization.
    pub fn pending_count(&self) -> usize {
        self.edges.values().map(|e| e.ring.pending()).sum()
    }

    /// Number of AND nodes.
    pub fn gate_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.kind == NodeKind::And)
            .count()
    }

    /// The node name, or its ID.
    pub fn label(&self, node: NodeId) -> String {
        match &self.nodes[node].name {
            Some(name) => name.clone(),
            None => node.to_string(),
        }
    }

    /// Every latch slot of every edge, for in-place rewriting.
    pub(crate) fn latches_mut(&mut self) -> impl Iterator<Item = &mut Latch> + '_ {
        self.edges.iter_mut().flat_map(|(_, e)| e.ring.iter_mut())
    }

    /// Nodes in topological order of the latch-free edges.
    pub fn combinational_order(&self) -> Result<Vec<NodeId>, RetimeError> {
        let mut graph = DiGraph::<NodeId, ()>::with_capacity(self.node_count(), self.edge_count());
        let indices: Vec<_> = self.nodes.ids().map(|id| graph.add_node(id)).collect();
        for edge in self.edges.values() {
            if edge.ring.is_empty() {
                graph.add_edge(indices[edge.driver.index()], indices[edge.sink.index()], ());
            }
        }
        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| graph[n]).collect()),
            Err(cycle) => Err(RetimeError::CombinationalCycle {
                node: self.label(graph[cycle.node_id()]),
            }),
        }
    }

    /// The unit-delay timing view: one unit per AND gate, none elsewhere.
    ///
    /// Edges out of the constant are left out, since a constant never
    /// limits the period. Node `i` of the result is node `i` of the graph.
    pub fn cycle_graph(&self) -> CycleGraph {
        let mut timing = CycleGraph::new();
        for (id, node) in self.nodes.iter() {
            let delay = if node.kind == NodeKind::And { 1.0 } else { 0.0 };
            timing.add_node(self.label(id), delay);
        }
        for edge in self.edges.values() {
            if self.is_const(edge.driver) {
                continue;
            }
            timing.add_edge(
                CycleNodeId::from_raw(edge.driver.as_raw()),
                CycleNodeId::from_raw(edge.sink.as_raw()),
                0.0,
                edge.ring.len() as u32,
            );
        }
        timing
    }
}
