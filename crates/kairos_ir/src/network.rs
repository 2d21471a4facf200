//! The sequential AND network: nodes, signals, fanin edges, and latches.

use crate::arena::Arena;
use crate::error::NetworkError;
use crate::ids::NodeId;
use kairos_common::InitValue;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// Output phase of a signal: the driver's value or its complement.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// The driver's value.
    #[default]
    Positive,
    /// The complement of the driver's value.
    Negative,
}

impl Polarity {
    /// Builds a polarity from a complementation flag.
    pub fn from_complement(complement: bool) -> Self {
        if complement {
            Polarity::Negative
        } else {
            Polarity::Positive
        }
    }

    /// Returns `true` for [`Polarity::Negative`].
    pub fn is_negative(self) -> bool {
        self == Polarity::Negative
    }

    /// Index `0` for positive and `1` for negative, for per-phase tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Both phases, positive first.
    pub const BOTH: [Polarity; 2] = [Polarity::Positive, Polarity::Negative];
}

impl Not for Polarity {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

/// A reference to a node output in a given polarity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Signal {
    /// The driving node.
    pub node: NodeId,
    /// Whether the reader sees the value or its complement.
    #[serde(default)]
    pub polarity: Polarity,
}

impl Signal {
    /// The driver's value, uncomplemented.
    pub fn positive(node: NodeId) -> Self {
        Self {
            node,
            polarity: Polarity::Positive,
        }
    }

    /// The complement of the driver's value.
    pub fn negative(node: NodeId) -> Self {
        Self {
            node,
            polarity: Polarity::Negative,
        }
    }

    /// Returns `true` if the signal is complemented.
    pub fn is_complemented(self) -> bool {
        self.polarity.is_negative()
    }
}

impl Not for Signal {
    type Output = Self;

    fn not(self) -> Self {
        Self {
            node: self.node,
            polarity: !self.polarity,
        }
    }
}

/// The kind of a network node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Constant true. Complemented readers see false.
    Const,
    /// A primary input.
    Input,
    /// A primary output with exactly one fanin.
    Output,
    /// A two-input AND gate.
    And,
}

impl NodeKind {
    /// The number of fanins a node of this kind must have.
    pub fn arity(self) -> usize {
        match self {
            NodeKind::Const | NodeKind::Input => 0,
            NodeKind::Output => 1,
            NodeKind::And => 2,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NodeKind::Const => "const",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::And => "and",
        };
        f.write_str(text)
    }
}

/// A fanin edge: a driving signal plus the latches sitting on the edge.
///
/// `latches[0]` is nearest the reading node. Values are stored in the
/// driver's polarity; the complement applies when the reader samples them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fanin {
    /// The driving signal.
    pub signal: Signal,
    /// Latch initial values, nearest-to-sink first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub latches: Vec<InitValue>,
}

impl Fanin {
    /// A latch-free fanin.
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            latches: Vec::new(),
        }
    }

    /// A fanin carrying the given latches, nearest-to-sink first.
    pub fn with_latches(signal: Signal, latches: Vec<InitValue>) -> Self {
        Self { signal, latches }
    }

    /// Number of latches on this edge.
    pub fn latch_count(&self) -> usize {
        self.latches.len()
    }
}

/// A library gate attached to a node by mapping-aware retiming.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateBinding {
    /// Library gate name.
    pub gate: String,
    /// Phase of the original function the gate drives.
    pub output_phase: Polarity,
    /// Gate pins in order, each a leaf node and the phase the pin sees.
    pub inputs: Vec<Signal>,
    /// Gate area as reported by the library.
    pub area: f64,
}

/// A node of the sequential network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// What the node computes.
    pub kind: NodeKind,
    /// Optional user-facing name (inputs and outputs usually have one).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fanin edges in pin order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fanins: Vec<Fanin>,
    /// Mapped gate decoration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<GateBinding>,
}

impl Node {
    /// Creates an unnamed node with the given fanins.
    pub fn new(kind: NodeKind, fanins: Vec<Fanin>) -> Self {
        Self {
            kind,
            name: None,
            fanins,
            binding: None,
        }
    }
}

/// A sequential network of two-input AND gates with latches on edges.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeqNetwork {
    /// Network name.
    pub name: String,
    nodes: Arena<NodeId, Node>,
}

impl SeqNetwork {
    /// Creates an empty network.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Arena::new(),
        }
    }

    /// Appends a fully formed node. Fanins may refer to nodes added later;
    /// [`validate`](Self::validate) checks the result.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    /// Adds a constant-true node.
    pub fn add_const(&mut self) -> NodeId {
        self.add_node(Node::new(NodeKind::Const, Vec::new()))
    }

    /// Adds a named primary input.
    pub fn add_input(&mut self, name: impl Into<String>) -> NodeId {
        let mut node = Node::new(NodeKind::Input, Vec::new());
        node.name = Some(name.into());
        self.add_node(node)
    }

    /// Adds a two-input AND gate with latch-free fanins.
    pub fn add_and(&mut self, a: Signal, b: Signal) -> NodeId {
        self.add_node(Node::new(NodeKind::And, vec![Fanin::new(a), Fanin::new(b)]))
    }

    /// Adds a named primary output reading `signal`.
    pub fn add_output(&mut self, name: impl Into<String>, signal: Signal) -> NodeId {
        let mut node = Node::new(NodeKind::Output, vec![Fanin::new(signal)]);
        node.name = Some(name.into());
        self.add_node(node)
    }

    /// Sets the name of a node.
    pub fn set_name(&mut self, node: NodeId, name: impl Into<String>) {
        self.nodes[node].name = Some(name.into());
    }

    /// Re-points a fanin, keeping its latches. Used to close feedback loops.
    ///
    /// # Panics
    ///
    /// Panics if the node or pin does not exist.
    pub fn set_fanin(&mut self, node: NodeId, pin: usize, signal: Signal) {
        self.nodes[node].fanins[pin].signal = signal;
    }

    /// Adds a latch on a fanin edge at the driver side.
    ///
    /// # Panics
    ///
    /// Panics if the node or pin does not exist.
    pub fn add_latch(&mut self, node: NodeId, pin: usize, value: InitValue) {
        self.nodes[node].fanins[pin].latches.push(value);
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Returns a mutable reference to the node with the given ID.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Returns `true` if the ID names a node of this network.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Iterates over `(id, node)` pairs in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the network has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn ids_of(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Primary inputs in ID order.
    pub fn inputs(&self) -> Vec<NodeId> {
        self.ids_of(NodeKind::Input)
    }

    /// Primary outputs in ID order.
    pub fn outputs(&self) -> Vec<NodeId> {
        self.ids_of(NodeKind::Output)
    }

    /// AND gates in ID order.
    pub fn ands(&self) -> Vec<NodeId> {
        self.ids_of(NodeKind::And)
    }

    /// Total number of latches over all edges.
    pub fn latch_count(&self) -> usize {
        self.nodes
            .values()
            .flat_map(|n| n.fanins.iter())
            .map(Fanin::latch_count)
            .sum()
    }

    /// A display label: the node name if present, otherwise the ID.
    pub fn label(&self, id: NodeId) -> String {
        match self.nodes.get(id).name.as_deref() {
            Some(name) => name.to_string(),
            None => id.to_string(),
        }
    }

    /// For each node (indexed by ID), the `(reader, pin)` pairs reading it.
    pub fn fanouts(&self) -> Vec<Vec<(NodeId, usize)>> {
        let mut fanouts = vec![Vec::new(); self.len()];
        for (id, node) in self.nodes.iter() {
            for (pin, fanin) in node.fanins.iter().enumerate() {
                if self.contains(fanin.signal.node) {
                    fanouts[fanin.signal.node.index()].push((id, pin));
                }
            }
        }
        fanouts
    }

    /// Checks node arities, references, and the absence of combinational cycles.
    pub fn validate(&self) -> Result<(), NetworkError> {
        for (id, node) in self.nodes.iter() {
            let expected = node.kind.arity();
            if node.fanins.len() != expected {
                return Err(NetworkError::WrongArity {
                    node: id,
                    kind: node.kind,
                    expected,
                    found: node.fanins.len(),
                });
            }
            for fanin in &node.fanins {
                let driver = fanin.signal.node;
                if !self.contains(driver) {
                    return Err(NetworkError::DanglingFanin { node: id, driver });
                }
                if self.nodes[driver].kind == NodeKind::Output {
                    return Err(NetworkError::OutputDriver { node: id, driver });
                }
            }
        }
        self.combinational_order().map(|_| ())
    }

    /// All nodes in topological order of the latch-free edges.
    ///
    /// The order is deterministic for a given network, so relaxation and
    /// search results are reproducible. Fails if latch-free edges form a cycle.
    pub fn combinational_order(&self) -> Result<Vec<NodeId>, NetworkError> {
        let mut graph = DiGraph::<NodeId, ()>::with_capacity(self.len(), self.len() * 2);
        let indices: Vec<_> = self.nodes.ids().map(|id| graph.add_node(id)).collect();

        for (id, node) in self.nodes.iter() {
            for fanin in &node.fanins {
                if fanin.latches.is_empty() && self.contains(fanin.signal.node) {
                    graph.add_edge(indices[fanin.signal.node.index()], indices[id.index()], ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| graph[n]).collect()),
            Err(cycle) => Err(NetworkError::CombinationalCycle {
                node: graph[cycle.node_id()],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `PI -> A -> B -> PO` with `A = AND(PI, 1)` and `B = AND(A, 1)`.
    fn chain() -> (SeqNetwork, [NodeId; 5]) {
        let mut net = SeqNetwork::new("chain");
        let one = net.add_const();
        let pi = net.add_input("pi");
        let a = net.add_and(Signal::positive(pi), Signal::positive(one));
        let b = net.add_and(Signal::positive(a), Signal::positive(one));
        let po = net.add_output("po", Signal::positive(b));
        (net, [one, pi, a, b, po])
    }

    #[test]
    fn build_and_query() {
        let (mut net, [_, pi, a, _, po]) = chain();
        net.add_latch(a, 0, InitValue::Zero);
        net.add_latch(po, 0, InitValue::DontCare);
        assert_eq!(net.len(), 5);
        assert_eq!(net.inputs(), vec![pi]);
        assert_eq!(net.outputs(), vec![po]);
        assert_eq!(net.ands().len(), 2);
        assert_eq!(net.latch_count(), 2);
        assert_eq!(net.label(pi), "pi");
        assert_eq!(net.label(a), "n2");
        assert!(net.validate().is_ok());
    }

    #[test]
    fn fanouts_index_readers() {
        let (net, [one, _, a, b, _]) = chain();
        let fanouts = net.fanouts();
        assert_eq!(fanouts[one.index()], vec![(a, 1), (b, 1)]);
        assert_eq!(fanouts[a.index()], vec![(b, 0)]);
    }

    #[test]
    fn combinational_order_respects_edges() {
        let (net, [_, pi, a, b, po]) = chain();
        let order = net.combinational_order().unwrap();
        let pos = |id: NodeId| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(pi) < pos(a));
        assert!(pos(a) < pos(b));
        assert!(pos(b) < pos(po));
    }

    #[test]
    fn latch_breaks_cycle() {
        let mut net = SeqNetwork::new("loop");
        let pi = net.add_input("pi");
        let a = net.add_and(Signal::positive(pi), Signal::positive(pi));
        let b = net.add_and(Signal::positive(a), Signal::positive(pi));
        net.set_fanin(a, 1, Signal::negative(b));
        assert!(matches!(
            net.validate(),
            Err(NetworkError::CombinationalCycle { .. })
        ));

        net.add_latch(a, 1, InitValue::One);
        assert!(net.validate().is_ok());
    }

    #[test]
    fn arity_and_reference_checks() {
        let mut net = SeqNetwork::new("bad");
        let pi = net.add_input("pi");
        net.add_node(Node::new(NodeKind::And, vec![Fanin::new(Signal::positive(pi))]));
        assert!(matches!(
            net.validate(),
            Err(NetworkError::WrongArity { expected: 2, found: 1, .. })
        ));

        let mut net = SeqNetwork::new("dangling");
        net.add_output("po", Signal::positive(NodeId::from_raw(9)));
        assert!(matches!(
            net.validate(),
            Err(NetworkError::DanglingFanin { .. })
        ));

        let mut net = SeqNetwork::new("po-driver");
        let pi = net.add_input("pi");
        let po = net.add_output("po", Signal::positive(pi));
        net.add_output("po2", Signal::positive(po));
        assert!(matches!(
            net.validate(),
            Err(NetworkError::OutputDriver { .. })
        ));
    }

    #[test]
    fn signal_negation() {
        let s = Signal::positive(NodeId::from_raw(1));
        assert!((!s).is_complemented());
        assert_eq!(!!s, s);
        assert_eq!(Polarity::Negative.index(), 1);
        assert_eq!(Polarity::from_complement(true), Polarity::Negative);
    }

    #[test]
    fn serde_roundtrip() {
        let (mut net, [_, _, a, _, _]) = chain();
        net.add_latch(a, 0, InitValue::One);
        let json = serde_json::to_string(&net).unwrap();
        let back: SeqNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), net.len());
        assert_eq!(back.node(a).fanins[0].latches, vec![InitValue::One]);
        assert_eq!(back.name, "chain");
    }
}
