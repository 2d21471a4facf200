//! Three-valued cycle simulation of a sequential network.
//!
//! Don't-care plays the role of `X`: AND-consensus propagates it unless the
//! other operand is a controlling zero. Used to compare a retimed network
//! with its original from their declared initial states.

use crate::error::NetworkError;
use crate::ids::NodeId;
use crate::network::{Fanin, NodeKind, SeqNetwork};
use kairos_common::InitValue;

/// A cycle-accurate simulator over a borrowed network.
pub struct Simulator<'a> {
    network: &'a SeqNetwork,
    order: Vec<NodeId>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    /// Current latch contents per `(node, pin)`, nearest-to-sink first.
    state: Vec<Vec<Vec<InitValue>>>,
    values: Vec<InitValue>,
}

impl<'a> Simulator<'a> {
    /// Creates a simulator loaded with the network's declared initial state.
    ///
    /// Pending (`Unknown`) latches are read as don't-care.
    pub fn new(network: &'a SeqNetwork) -> Result<Self, NetworkError> {
        network.validate()?;
        let order = network.combinational_order()?;
        let state = network
            .nodes()
            .map(|(_, node)| {
                node.fanins
                    .iter()
                    .map(|f| {
                        f.latches
                            .iter()
                            .map(|&v| {
                                if v == InitValue::Unknown {
                                    InitValue::DontCare
                                } else {
                                    v
                                }
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Ok(Self {
            network,
            order,
            inputs: network.inputs(),
            outputs: network.outputs(),
            state,
            values: vec![InitValue::DontCare; network.len()],
        })
    }

    fn read(&self, node: NodeId, pin: usize, fanin: &Fanin) -> InitValue {
        let raw = match self.state[node.index()][pin].first() {
            Some(&latched) => latched,
            None => self.values[fanin.signal.node.index()],
        };
        raw.complement_if(fanin.signal.is_complemented())
    }

    /// Evaluates one clock cycle and returns the primary output values.
    ///
    /// `inputs` are matched to primary inputs in ID order; missing entries
    /// read as don't-care.
    pub fn step(&mut self, inputs: &[InitValue]) -> Vec<InitValue> {
        for (i, &pi) in self.inputs.iter().enumerate() {
            self.values[pi.index()] = inputs.get(i).copied().unwrap_or(InitValue::DontCare);
        }

        for &id in &self.order {
            let node = self.network.node(id);
            let value = match node.kind {
                NodeKind::Const => InitValue::One,
                NodeKind::Input => continue,
                NodeKind::Output => self.read(id, 0, &node.fanins[0]),
                NodeKind::And => {
                    self.read(id, 0, &node.fanins[0]) & self.read(id, 1, &node.fanins[1])
                }
            };
            self.values[id.index()] = value;
        }

        let outputs = self.outputs.iter().map(|o| self.values[o.index()]).collect();

        // Clock edge: every latch takes the value of its driver-side neighbor.
        for (id, node) in self.network.nodes() {
            for (pin, fanin) in node.fanins.iter().enumerate() {
                let chain = &mut self.state[id.index()][pin];
                if chain.is_empty() {
                    continue;
                }
                chain.remove(0);
                chain.push(self.values[fanin.signal.node.index()]);
            }
        }

        outputs
    }

    /// Runs a whole stimulus and collects the outputs of every cycle.
    pub fn run(&mut self, stimulus: &[Vec<InitValue>]) -> Vec<Vec<InitValue>> {
        stimulus.iter().map(|inputs| self.step(inputs)).collect()
    }
}
