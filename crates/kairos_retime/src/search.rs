//! Minimum-period search and lag derivation.
//!
//! The search brackets the period between a lower bound (0, or the maximum
//! cycle ratio when enabled) and the acyclic upper bound, then bisects with
//! relaxation as the feasibility oracle. Feasibility is monotone in the
//! period, so the bracket always keeps an infeasible `lo` and a feasible
//! `hi`.
//!
//! Lags come from the L-values at the winning period: a gate whose output
//! arrives in window `k` (that is, `k * Fi < L <= (k + 1) * Fi`) moves `k`
//! latches backward. Sources and outputs keep lag 0. Nodes no source
//! reaches have no finite L-value; they take the smallest lag their fanouts
//! allow.

use crate::codes;
use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use crate::relax::{Arrival, ArrivalModel, Feasibility, Relaxation};
use kairos_common::Tolerance;
use kairos_config::RetimeOptions;
use kairos_diagnostics::{Diagnostic, DiagnosticSink};
use kairos_ir::{NodeId, NodeKind};
use kairos_timing::{longest_path, max_cycle_ratio, CycleError};

/// The bracket and step of a period search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchBounds {
    /// A period known (or assumed) infeasible.
    pub lower: f64,
    /// The period tested first; must be feasible.
    pub upper: f64,
    /// Stop once the bracket is this narrow.
    pub resolution: f64,
    /// Round midpoints down to integers.
    pub integral: bool,
}

/// The outcome of a period search.
#[derive(Clone, Debug)]
pub struct SearchResult {
    /// The smallest feasible period found.
    pub period: f64,
    /// L-values at that period.
    pub table: Vec<Arrival>,
    /// The bracket the search started from.
    pub bounds: SearchBounds,
}

fn cycle_error(graph: &RetimeGraph, err: CycleError) -> RetimeError {
    let node = match err {
        CycleError::ZeroLatchCycle { node } | CycleError::CombinationalCycle { node } => node,
    };
    RetimeError::CombinationalCycle {
        node: graph.label(NodeId::from_raw(node.as_raw())),
    }
}

/// Search bounds for the unit-delay model.
///
/// The upper bound is the longest latch-free path plus the configured
/// margin. With an integral resolution the search runs over integers.
pub fn plain_bounds(
    graph: &RetimeGraph,
    options: &RetimeOptions,
    sink: &DiagnosticSink,
) -> Result<SearchBounds, RetimeError> {
    let tolerance = Tolerance(options.epsilon);
    let timing = graph.cycle_graph();
    let longest = longest_path(&timing).map_err(|e| cycle_error(graph, e))?;
    let integral = options.resolution.fract() == 0.0;

    let mut upper = (longest.max + options.margin).max(options.resolution);
    if integral {
        upper = tolerance.ceil(upper);
    }

    let mut lower = 0.0;
    if options.use_cycle_bound {
        if let Some(critical) = max_cycle_ratio(&timing).map_err(|e| cycle_error(graph, e))? {
            lower = if integral {
                tolerance.ceil(critical.ratio) - 1.0
            } else {
                critical.ratio - options.resolution
            };
            lower = lower.clamp(0.0, upper);
            let mut diag = Diagnostic::note(
                codes::CYCLE_BOUND,
                format!(
                    "critical cycle ratio {:.3} ({} gates over {} latches) bounds the period below",
                    critical.ratio, critical.delay, critical.latches
                ),
            );
            if let Some(&first) = critical.cycle.first() {
                diag = diag.with_subject(graph.label(NodeId::from_raw(first.as_raw())));
            }
            sink.emit(diag);
        }
    }

    Ok(SearchBounds {
        lower,
        upper,
        resolution: options.resolution,
        integral,
    })
}

/// Bisects for the smallest feasible period.
pub fn search_min_period<M: ArrivalModel>(
    relax: &mut Relaxation<'_, M>,
    bounds: SearchBounds,
    sink: &DiagnosticSink,
) -> Result<SearchResult, RetimeError> {
    let eps = relax.tolerance().epsilon();
    let top = relax.run(bounds.upper);
    if !top.feasibility.is_feasible() {
        return Err(RetimeError::InfeasibleUpperBound {
            period: bounds.upper,
        });
    }

    let mut lo = bounds.lower;
    let mut hi = bounds.upper;
    let mut table = top.table;
    while hi - lo > bounds.resolution + eps {
        let mut mid = (lo + hi) / 2.0;
        if bounds.integral {
            mid = mid.floor();
        }
        if mid <= lo || mid >= hi {
            break;
        }
        let run = relax.run(mid);
        match run.feasibility {
            Feasibility::Feasible => {
                hi = mid;
                table = run.table;
            }
            Feasibility::Infeasible => lo = mid,
            Feasibility::Timeout => {
                sink.emit(Diagnostic::note(
                    codes::SWEEP_BUDGET,
                    format!("period {mid} did not settle within the sweep budget"),
                ));
                lo = mid;
            }
        }
    }

    sink.emit(Diagnostic::note(
        codes::PERIOD_FOUND,
        format!(
            "minimum feasible period {hi} after {} feasibility tests",
            relax.tests()
        ),
    ));
    Ok(SearchResult {
        period: hi,
        table,
        bounds,
    })
}

/// The lag implied by an L-value, or `None` if no source reaches the node.
pub fn lag_from_arrival(arrival: f64, period: f64, tolerance: Tolerance) -> Option<i32> {
    if !arrival.is_finite() || period <= 0.0 {
        return None;
    }
    Some(((arrival - tolerance.epsilon()) / period).ceil() as i32 - 1)
}

/// Lags for the unit-delay model: AND gates from their L-values, every
/// other node 0.
pub fn plain_lags(
    graph: &RetimeGraph,
    table: &[Arrival],
    period: f64,
    tolerance: Tolerance,
) -> Vec<Option<i32>> {
    graph
        .node_ids()
        .map(|id| match graph.kind(id) {
            NodeKind::And => lag_from_arrival(table[id.index()][0], period, tolerance),
            _ => Some(0),
        })
        .collect()
}

/// Fills in missing lags with the smallest value every fanout permits.
pub fn complete_lags(graph: &RetimeGraph, partial: &[Option<i32>]) -> Vec<i32> {
    let unknown: Vec<bool> = partial.iter().map(Option::is_none).collect();
    let mut lags: Vec<i32> = partial.iter().map(|l| l.unwrap_or(0)).collect();
    if !unknown.iter().any(|&u| u) {
        return lags;
    }

    for _ in 0..=graph.node_count() {
        let mut changed = false;
        for e in graph.edge_ids() {
            let edge = graph.edge(e);
            let (u, v) = (edge.driver().index(), edge.sink().index());
            if !unknown[u] || graph.is_const(edge.driver()) {
                continue;
            }
            let bound = lags[v] + edge.latch_count() as i32;
            if bound < lags[u] {
                lags[u] = bound;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    lags
}

/// Checks that every edge keeps a non-negative latch count under `lags`.
pub fn check_lags(graph: &RetimeGraph, lags: &[i32]) -> Result<(), RetimeError> {
    for id in graph.node_ids() {
        if graph.kind(id) != NodeKind::And && lags[id.index()] != 0 {
            return Err(RetimeError::internal(format!(
                "{} node {} has lag {}",
                graph.kind(id),
                graph.label(id),
                lags[id.index()]
            )));
        }
    }
    for e in graph.edge_ids() {
        let edge = graph.edge(e);
        if graph.is_const(edge.driver()) {
            continue;
        }
        let after =
            edge.latch_count() as i64 + lags[edge.sink().index()] as i64 - lags[edge.driver().index()] as i64;
        if after < 0 {
            return Err(RetimeError::internal(format!(
                "lags leave {after} latches between {} and {}",
                graph.label(edge.driver()),
                graph.label(edge.sink())
            )));
        }
    }
    Ok(())
}

/// Drops every backward move and returns how many lags were clipped.
///
/// Clipping positive lags to zero keeps legal lags legal, but the period
/// they were frozen for is no longer guaranteed.
pub fn restrict_forward(lags: &mut [i32]) -> usize {
    let mut clipped = 0;
    for lag in lags.iter_mut().filter(|l| **l > 0) {
        *lag = 0;
        clipped += 1;
    }
    clipped
}

/// The period a graph achieves as it stands: its longest latch-free path.
pub fn achieved_period(graph: &RetimeGraph) -> Result<f64, RetimeError> {
    let longest = longest_path(&graph.cycle_graph()).map_err(|e| cycle_error(graph, e))?;
    Ok(longest.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relax::PlainModel;
    use kairos_common::InitValue;
    use kairos_ir::{SeqNetwork, Signal};

    /// `PI -> A -> B -> C -> PO` with one latch on the output edge.
    fn chain() -> (RetimeGraph, [NodeId; 4]) {
        let mut net = SeqNetwork::new("chain");
        let one = net.add_const();
        let pi = net.add_input("pi");
        let a = net.add_and(Signal::positive(pi), Signal::positive(one));
        let b = net.add_and(Signal::positive(a), Signal::positive(one));
        let c = net.add_and(Signal::positive(b), Signal::positive(one));
        let po = net.add_output("po", Signal::positive(c));
        net.add_latch(po, 0, InitValue::Zero);
        (RetimeGraph::from_network(&net).unwrap(), [a, b, c, po])
    }

    #[test]
    fn chain_search_and_lags() {
        let (graph, [a, b, c, _]) = chain();
        let options = RetimeOptions::default();
        let sink = DiagnosticSink::new();
        let bounds = plain_bounds(&graph, &options, &sink).unwrap();
        assert_eq!(bounds.upper, 3.0);
        assert_eq!(bounds.lower, 0.0);
        assert!(bounds.integral);

        let mut relax = Relaxation::new(&graph, PlainModel, Tolerance::DEFAULT, None).unwrap();
        let result = search_min_period(&mut relax, bounds, &sink).unwrap();
        assert_eq!(result.period, 2.0);

        let lags = complete_lags(
            &graph,
            &plain_lags(&graph, &result.table, result.period, Tolerance::DEFAULT),
        );
        assert_eq!(lags[a.index()], 0);
        assert_eq!(lags[b.index()], 0);
        assert_eq!(lags[c.index()], 1);
        check_lags(&graph, &lags).unwrap();
    }

    #[test]
    fn lag_windows() {
        let t = Tolerance::DEFAULT;
        assert_eq!(lag_from_arrival(1.0, 2.0, t), Some(0));
        assert_eq!(lag_from_arrival(2.0, 2.0, t), Some(0));
        assert_eq!(lag_from_arrival(2.5, 2.0, t), Some(1));
        assert_eq!(lag_from_arrival(-1.0, 2.0, t), Some(-1));
        assert_eq!(lag_from_arrival(f64::NEG_INFINITY, 2.0, t), None);
    }

    #[test]
    fn unreached_nodes_follow_fanouts() {
        // A latched loop with no input: g1 -> g2 -> g1, g2 -> po.
        let mut net = SeqNetwork::new("floating");
        let one = net.add_const();
        let g1 = net.add_and(Signal::positive(one), Signal::positive(one));
        let g2 = net.add_and(Signal::positive(g1), Signal::positive(one));
        net.set_fanin(g1, 0, Signal::positive(g2));
        net.add_latch(g1, 0, InitValue::One);
        net.add_latch(g1, 0, InitValue::One);
        let po = net.add_output("po", Signal::positive(g2));
        let graph = RetimeGraph::from_network(&net).unwrap();

        let mut partial = vec![Some(0); graph.node_count()];
        partial[g1.index()] = None;
        partial[g2.index()] = None;
        let lags = complete_lags(&graph, &partial);
        assert_eq!(lags[g2.index()], 0);
        assert_eq!(lags[g1.index()], 0);
        assert_eq!(lags[po.index()], 0);
        check_lags(&graph, &lags).unwrap();
    }

    #[test]
    fn illegal_lags_are_rejected() {
        let (graph, [a, _, _, _]) = chain();
        let mut lags = vec![0; graph.node_count()];
        lags[a.index()] = 1;
        assert!(matches!(check_lags(&graph, &lags), Err(RetimeError::Internal(_))));
        assert_eq!(restrict_forward(&mut lags), 1);
        assert_eq!(lags[a.index()], 0);
        check_lags(&graph, &lags).unwrap();
        assert_eq!(achieved_period(&graph).unwrap(), 3.0);
    }

    #[test]
    fn cycle_bound_raises_lower_bound() {
        // Three gates around one latch: ratio 3.
        let mut net = SeqNetwork::new("ring");
        let pi = net.add_input("pi");
        let a = net.add_and(Signal::positive(pi), Signal::positive(pi));
        let b = net.add_and(Signal::positive(a), Signal::positive(pi));
        let c = net.add_and(Signal::positive(b), Signal::positive(pi));
        net.set_fanin(a, 1, Signal::positive(c));
        net.add_latch(a, 1, InitValue::Zero);
        net.add_output("po", Signal::positive(c));
        let graph = RetimeGraph::from_network(&net).unwrap();

        let options = RetimeOptions {
            use_cycle_bound: true,
            ..RetimeOptions::default()
        };
        let sink = DiagnosticSink::with_verbosity(true);
        let bounds = plain_bounds(&graph, &options, &sink).unwrap();
        assert_eq!(bounds.lower, 2.0);
        assert_eq!(bounds.upper, 3.0);
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::CYCLE_BOUND));

        let mut relax = Relaxation::new(&graph, PlainModel, Tolerance::DEFAULT, None).unwrap();
        let result = search_min_period(&mut relax, bounds, &sink).unwrap();
        assert_eq!(result.period, 3.0);
        assert_eq!(relax.tests(), 1);
    }
}
