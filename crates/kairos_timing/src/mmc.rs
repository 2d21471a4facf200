//! Maximum cycle ratio by Howard's policy iteration.
//!
//! For every cycle `C`, its ratio is `sum(delay) / sum(latches)`. No retiming
//! can reach a clock period below the largest ratio, and with a unit delay
//! model the smallest feasible period is the ratio rounded up. Each cyclic
//! strongly connected component is solved independently.
//!
//! A policy picks one outgoing edge per node. Evaluating a policy finds the
//! cycles of the resulting functional graph, their ratios (`eta`) and
//! relative potentials (`x`). The policy is then improved, first towards
//! successors reaching a larger ratio and then towards larger potentials,
//! until neither step changes it.

use crate::error::CycleError;
use crate::graph::CycleGraph;
use crate::ids::CycleNodeId;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use std::collections::{HashMap, VecDeque};

const TOLERANCE: f64 = 1e-9;
const MAX_ROUNDS: usize = 10_000;

/// The critical cycle of a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRatio {
    /// `delay / latches` of the critical cycle.
    pub ratio: f64,
    /// Total delay around the cycle.
    pub delay: f64,
    /// Total latches around the cycle.
    pub latches: u32,
    /// The nodes of the cycle in traversal order.
    pub cycle: Vec<CycleNodeId>,
}

/// Local edge inside one component: target, traversal delay, latches.
#[derive(Clone, Copy)]
struct Arc {
    to: usize,
    delay: f64,
    latches: u32,
}

/// Computes the maximum cycle ratio of the graph.
///
/// Returns `Ok(None)` for an acyclic graph. A cycle without latches is
/// reported as [`CycleError::ZeroLatchCycle`].
pub fn max_cycle_ratio(graph: &CycleGraph) -> Result<Option<CycleRatio>, CycleError> {
    let mut pg = DiGraph::<usize, ()>::with_capacity(graph.node_count(), graph.edge_count());
    let indices: Vec<_> = (0..graph.node_count()).map(|i| pg.add_node(i)).collect();
    for edge in &graph.edges {
        pg.add_edge(indices[edge.from.index()], indices[edge.to.index()], ());
    }

    let mut best: Option<CycleRatio> = None;
    for scc in tarjan_scc(&pg) {
        let members: Vec<usize> = scc.iter().map(|&ix| pg[ix]).collect();
        let cyclic = members.len() > 1
            || graph
                .edges
                .iter()
                .any(|e| e.from.index() == members[0] && e.to.index() == members[0]);
        if !cyclic {
            continue;
        }
        let found = solve_component(graph, &members)?;
        if best.as_ref().map_or(true, |b| found.ratio > b.ratio) {
            best = Some(found);
        }
    }
    Ok(best)
}

fn solve_component(graph: &CycleGraph, members: &[usize]) -> Result<CycleRatio, CycleError> {
    let local: HashMap<usize, usize> = members.iter().enumerate().map(|(i, &g)| (g, i)).collect();
    let n = members.len();

    let mut arcs: Vec<Vec<Arc>> = vec![Vec::new(); n];
    for edge in &graph.edges {
        if let (Some(&from), Some(&to)) = (local.get(&edge.from.index()), local.get(&edge.to.index())) {
            arcs[from].push(Arc {
                to,
                delay: graph.traversal_delay(edge),
                latches: edge.latches,
            });
        }
    }

    // Initial policy: the most expensive outgoing arc of each node.
    let mut policy: Vec<usize> = arcs
        .iter()
        .map(|out| {
            let mut pick = 0;
            for (i, arc) in out.iter().enumerate() {
                if arc.delay > out[pick].delay {
                    pick = i;
                }
            }
            pick
        })
        .collect();

    let mut eval = evaluate(&arcs, &policy, members)?;
    for _ in 0..MAX_ROUNDS {
        if !improve(&arcs, &mut policy, &eval) {
            break;
        }
        eval = evaluate(&arcs, &policy, members)?;
    }

    let critical = eval
        .cycles
        .into_iter()
        .fold(None::<CycleRatio>, |acc, c| match acc {
            Some(a) if a.ratio >= c.ratio => Some(a),
            _ => Some(c),
        });
    // A strongly connected component with a cycle always yields one policy cycle.
    critical.ok_or(CycleError::ZeroLatchCycle {
        node: CycleNodeId::from_raw(members[0] as u32),
    })
}

struct Evaluation {
    eta: Vec<f64>,
    x: Vec<f64>,
    cycles: Vec<CycleRatio>,
}

/// Finds the cycles of the policy graph and the ratio and potential of
/// every node.
fn evaluate(arcs: &[Vec<Arc>], policy: &[usize], members: &[usize]) -> Result<Evaluation, CycleError> {
    let n = arcs.len();
    let succ = |v: usize| arcs[v][policy[v]].to;

    // 0 = unseen, 1 = on the current walk, 2 = done
    let mut mark = vec![0u8; n];
    let mut handles = Vec::new();
    let mut cycles = Vec::new();
    for start in 0..n {
        let mut walk = Vec::new();
        let mut v = start;
        while mark[v] == 0 {
            mark[v] = 1;
            walk.push(v);
            v = succ(v);
        }
        if mark[v] == 1 {
            // v closes a new cycle
            let pos = walk.iter().position(|&w| w == v).unwrap_or(0);
            let cycle = &walk[pos..];
            let (mut delay, mut latches) = (0.0, 0u32);
            for &u in cycle {
                let arc = arcs[u][policy[u]];
                delay += arc.delay;
                latches += arc.latches;
            }
            if latches == 0 {
                return Err(CycleError::ZeroLatchCycle {
                    node: CycleNodeId::from_raw(members[v] as u32),
                });
            }
            handles.push((v, delay / f64::from(latches)));
            cycles.push(CycleRatio {
                ratio: delay / f64::from(latches),
                delay,
                latches,
                cycle: cycle
                    .iter()
                    .map(|&u| CycleNodeId::from_raw(members[u] as u32))
                    .collect(),
            });
        }
        for w in walk {
            mark[w] = 2;
        }
    }

    // Propagate ratios and potentials backwards along the policy from each handle.
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    for v in 0..n {
        preds[succ(v)].push(v);
    }
    let mut eta = vec![f64::NEG_INFINITY; n];
    let mut x = vec![0.0; n];
    let mut done = vec![false; n];
    for (handle, ratio) in handles {
        eta[handle] = ratio;
        x[handle] = 0.0;
        done[handle] = true;
        let mut queue = VecDeque::from([handle]);
        while let Some(v) = queue.pop_front() {
            for &u in &preds[v] {
                if done[u] {
                    continue;
                }
                let arc = arcs[u][policy[u]];
                eta[u] = ratio;
                x[u] = arc.delay - ratio * f64::from(arc.latches) + x[v];
                done[u] = true;
                queue.push_back(u);
            }
        }
    }

    Ok(Evaluation { eta, x, cycles })
}

/// Improves the policy in place. Returns `true` if anything changed.
fn improve(arcs: &[Vec<Arc>], policy: &mut [usize], eval: &Evaluation) -> bool {
    let mut changed = false;

    // First: switch to successors whose component reaches a larger ratio.
    for v in 0..arcs.len() {
        let mut best = (eval.eta[v], policy[v]);
        for (i, arc) in arcs[v].iter().enumerate() {
            if eval.eta[arc.to] > best.0 + TOLERANCE {
                best = (eval.eta[arc.to], i);
            }
        }
        if best.1 != policy[v] {
            policy[v] = best.1;
            changed = true;
        }
    }
    if changed {
        return true;
    }

    // Then: within equal ratios, switch to larger potentials.
    for v in 0..arcs.len() {
        let ratio = eval.eta[v];
        let mut best = (eval.x[v], policy[v]);
        for (i, arc) in arcs[v].iter().enumerate() {
            if (eval.eta[arc.to] - ratio).abs() > TOLERANCE {
                continue;
            }
            let value = arc.delay - ratio * f64::from(arc.latches) + eval.x[arc.to];
            if value > best.0 + TOLERANCE {
                best = (value, i);
            }
        }
        if best.1 != policy[v] {
            policy[v] = best.1;
            changed = true;
        }
    }
    changed
}
