//! Feasibility testing by arrival-time relaxation.
//!
//! For a candidate period `Fi`, every node gets an L-value: the latest
//! arrival time of its output when latches on an edge shift arrival by
//! `-Fi` each. L-values start at 0 on sources and negative infinity
//! elsewhere and only ever increase. Sweeps visit the nodes in the
//! combinational order and update in place, so latch-free chains settle in
//! one sweep; latched feedback needs more.
//!
//! The test is infeasible as soon as an output's L-value exceeds `Fi`, or
//! as soon as some AND node has no implementation whose own delay fits in
//! one period (its L-value is then positive infinity in both phases). If
//! the sweep budget runs out with values still rising, some cycle has a
//! ratio above `Fi`; that case is reported as [`Feasibility::Timeout`] and
//! counts as infeasible.
//!
//! The arrival function is abstract ([`ArrivalModel`]) so the same loop runs
//! both the unit-delay model and the mapping-aware model. Each L-value has
//! two slots, one per output phase; the unit-delay model keeps them equal.

use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use kairos_common::Tolerance;
use kairos_ir::{NodeId, NodeKind};

/// An L-value per output phase, positive first.
pub type Arrival = [f64; 2];

/// The arrival function evaluated by relaxation.
pub trait ArrivalModel {
    /// Initial L-value of a primary input or the constant.
    fn source(&self, graph: &RetimeGraph, node: NodeId, period: f64) -> Arrival;

    /// L-value of an AND node or primary output from the current table.
    /// Outputs report their arrival in slot 0. A phase that cannot be
    /// produced by gates no slower than `period` is positive infinity.
    fn arrival(&self, graph: &RetimeGraph, node: NodeId, period: f64, table: &[Arrival]) -> Arrival;
}

/// Outcome of one feasibility test.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Feasibility {
    /// All L-values settled and every output meets the period.
    Feasible,
    /// Some output arrives later than the period, or some gate is slower
    /// than the period.
    Infeasible,
    /// The sweep budget ran out before the values settled.
    Timeout,
}

impl Feasibility {
    /// Returns `true` only for [`Feasibility::Feasible`].
    pub fn is_feasible(self) -> bool {
        self == Feasibility::Feasible
    }
}

/// Arrival shifted across `latches` latches at the given period.
///
/// An infinite period stands for the acyclic bound: a latched input then
/// starts a fresh path at time 0.
pub(crate) fn shifted(arrival: f64, latches: usize, period: f64) -> f64 {
    if latches == 0 {
        arrival
    } else if period.is_infinite() {
        0.0
    } else {
        arrival - period * latches as f64
    }
}

/// Unit delay per AND gate, zero elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainModel;

impl ArrivalModel for PlainModel {
    fn source(&self, _graph: &RetimeGraph, _node: NodeId, _period: f64) -> Arrival {
        [0.0, 0.0]
    }

    fn arrival(&self, graph: &RetimeGraph, node: NodeId, period: f64, table: &[Arrival]) -> Arrival {
        let latest = graph
            .fanins(node)
            .iter()
            .map(|&e| graph.edge(e))
            .map(|edge| shifted(table[edge.driver().index()][0], edge.latch_count(), period))
            .fold(f64::NEG_INFINITY, f64::max);
        let l = if graph.kind(node) == NodeKind::And {
            if period < 1.0 {
                f64::INFINITY
            } else {
                1.0 + latest
            }
        } else {
            latest
        };
        [l, l]
    }
}

/// The result of one relaxation run.
#[derive(Clone, Debug)]
pub struct Relaxed {
    /// The verdict.
    pub feasibility: Feasibility,
    /// L-values, indexed by node.
    pub table: Vec<Arrival>,
}

/// The relaxation engine for one graph and one arrival model.
pub struct Relaxation<'g, M> {
    graph: &'g RetimeGraph,
    model: M,
    order: Vec<NodeId>,
    tolerance: Tolerance,
    max_sweeps: usize,
    tests: usize,
}

impl<'g, M: ArrivalModel> Relaxation<'g, M> {
    /// Prepares relaxation. The default budget is one sweep per node plus one.
    pub fn new(
        graph: &'g RetimeGraph,
        model: M,
        tolerance: Tolerance,
        max_sweeps: Option<usize>,
    ) -> Result<Self, RetimeError> {
        let order = graph.combinational_order()?;
        Ok(Self {
            graph,
            model,
            order,
            tolerance,
            max_sweeps: max_sweeps.unwrap_or(graph.node_count() + 1),
            tests: 0,
        })
    }

    /// The arrival model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The graph being tested.
    pub fn graph(&self) -> &'g RetimeGraph {
        self.graph
    }

    /// The comparison tolerance.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Number of relaxation runs so far.
    pub fn tests(&self) -> usize {
        self.tests
    }

    /// Runs relaxation at `period` and returns the verdict with the L-values.
    pub fn run(&mut self, period: f64) -> Relaxed {
        self.tests += 1;
        let graph = self.graph;
        let mut table: Vec<Arrival> = graph
            .node_ids()
            .map(|id| match graph.kind(id) {
                NodeKind::Input | NodeKind::Const => self.model.source(graph, id, period),
                _ => [f64::NEG_INFINITY; 2],
            })
            .collect();
        let limit = period + self.tolerance.epsilon();

        for _ in 0..self.max_sweeps {
            let mut changed = false;
            for &id in &self.order {
                let kind = graph.kind(id);
                if matches!(kind, NodeKind::Input | NodeKind::Const) {
                    continue;
                }
                let next = self.model.arrival(graph, id, period, &table);
                for phase in 0..2 {
                    if self.tolerance.gt(next[phase], table[id.index()][phase]) {
                        table[id.index()][phase] = next[phase];
                        changed = true;
                    }
                }
                let late = match kind {
                    NodeKind::Output => table[id.index()][0] > limit,
                    _ => next.iter().all(|l| *l == f64::INFINITY),
                };
                if late {
                    return Relaxed {
                        feasibility: Feasibility::Infeasible,
                        table,
                    };
                }
            }
            if !changed {
                return Relaxed {
                    feasibility: Feasibility::Feasible,
                    table,
                };
            }
        }
        Relaxed {
            feasibility: Feasibility::Timeout,
            table,
        }
    }

    /// Runs relaxation and keeps only the verdict.
    pub fn feasible(&mut self, period: f64) -> Feasibility {
        self.run(period).feasibility
    }
}
