//! Latch sharing: merging compatible latches at a common stem.
//!
//! When several fanout edges of one node carry a latch next to the driver,
//! those latches hold the same next-state value and can become one. Their
//! initial values must agree: `0` and `1` cannot merge, while don't-care
//! merges with either. Each group of at least two compatible latches is
//! replaced by a single latch feeding a new buffer (`AND(stem, 1)`), and the
//! members are re-driven from the buffer. The buffer is then a stem itself,
//! so deeper latches merge in turn.
//!
//! The buffer is a real gate placed right after the merged latch, so every
//! latch-free path through it grows by one unit. Given a period limit, a
//! group is only merged when the longest latch-free path starting at its
//! buffer still fits.

use crate::error::RetimeError;
use crate::graph::RetimeGraph;
use crate::ring::{Latch, LatchRing};
use kairos_common::{InitValue, Tolerance};
use kairos_ir::{EdgeId, NodeId, NodeKind};
use serde::Serialize;
use std::collections::VecDeque;

/// Counters from the sharing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShareStats {
    /// Buffers inserted.
    pub buffers: usize,
    /// Latches removed.
    pub latches_saved: usize,
    /// Compatible groups left apart because their buffer would not fit the
    /// period.
    pub skipped: usize,
}

/// Splits latched fanout edges into two compatible groups by the value of
/// their driver-side latch. Don't-cares join the `0` group if it exists.
fn groups(graph: &RetimeGraph, stem: NodeId) -> [Vec<EdgeId>; 2] {
    let mut zeros = Vec::new();
    let mut ones = Vec::new();
    let mut free = Vec::new();
    for &e in graph.fanouts(stem) {
        match graph.edge(e).ring().back() {
            Some(Latch::Known(InitValue::Zero)) => zeros.push(e),
            Some(Latch::Known(InitValue::One)) => ones.push(e),
            Some(Latch::Known(_)) => free.push(e),
            Some(Latch::Pending(_)) | None => {}
        }
    }
    if zeros.is_empty() {
        ones.extend(free);
    } else {
        zeros.extend(free);
    }
    [zeros, ones]
}

/// Unit-delay length of the longest latch-free path starting at each node,
/// counting the node itself.
fn latch_free_tails(graph: &RetimeGraph) -> Result<Vec<f64>, RetimeError> {
    let mut tails = vec![0.0; graph.node_count()];
    for id in graph.combinational_order()?.into_iter().rev() {
        let own = if graph.kind(id) == NodeKind::And { 1.0 } else { 0.0 };
        let next = graph
            .fanouts(id)
            .iter()
            .map(|&e| graph.edge(e))
            .filter(|edge| edge.latch_count() == 0)
            .map(|edge| tails[edge.sink().index()])
            .fold(0.0, f64::max);
        tails[id.index()] = own + next;
    }
    Ok(tails)
}

/// Merges compatible driver-side latches across the whole graph.
///
/// With `limit`, a group is merged only if the unit-delay path starting at
/// its buffer stays within `limit`. Without it every compatible group merges.
pub fn share_latches(graph: &mut RetimeGraph, limit: Option<f64>) -> Result<ShareStats, RetimeError> {
    let mut stats = ShareStats::default();
    let mut tails = match limit {
        Some(_) => latch_free_tails(graph)?,
        None => Vec::new(),
    };
    let mut work: VecDeque<NodeId> = graph
        .node_ids()
        .filter(|&id| graph.kind(id) != NodeKind::Output)
        .collect();

    while let Some(stem) = work.pop_front() {
        for group in groups(graph, stem) {
            if group.len() < 2 {
                continue;
            }
            // Members left without latches read the buffer combinationally.
            let tail = 1.0
                + group
                    .iter()
                    .map(|&e| graph.edge(e))
                    .filter(|edge| edge.latch_count() == 1)
                    .map(|edge| tails.get(edge.sink().index()).copied().unwrap_or(0.0))
                    .fold(0.0, f64::max);
            if let Some(limit) = limit {
                if Tolerance::DEFAULT.gt(tail, limit) {
                    stats.skipped += 1;
                    continue;
                }
            }
            let mut merged = InitValue::DontCare;
            for &e in &group {
                let Some(latch) = graph.edge_mut(e).ring.pop_back() else {
                    return Err(RetimeError::internal("shared latch vanished"));
                };
                merged = merged.merge(latch.init()).ok_or_else(|| {
                    RetimeError::internal("incompatible latches grouped for sharing")
                })?;
            }

            let one = graph.constant();
            let buffer = graph.add_node(NodeKind::And, None);
            let mut ring = LatchRing::new();
            ring.push_back(Latch::Known(merged));
            graph.add_edge(stem, buffer, false, ring);
            graph.add_edge(one, buffer, false, LatchRing::new());
            for &e in &group {
                graph.redirect_driver(e, buffer);
            }

            if limit.is_some() {
                if tails.len() <= buffer.index() {
                    tails.resize(buffer.index() + 1, 0.0);
                }
                tails[buffer.index()] = tail;
            }

            stats.buffers += 1;
            stats.latches_saved += group.len() - 1;
            work.push_back(buffer);
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_ir::{SeqNetwork, Signal};
    use InitValue::*;

    fn fanout(values: &[InitValue]) -> (RetimeGraph, NodeId) {
        let mut net = SeqNetwork::new("fan");
        let a = net.add_input("a");
        for (i, &v) in values.iter().enumerate() {
            let o = net.add_output(format!("o{i}"), Signal::positive(a));
            net.add_latch(o, 0, v);
        }
        (RetimeGraph::from_network(&net).unwrap(), a)
    }

    #[test]
    fn merges_compatible_values() {
        let (mut graph, a) = fanout(&[Zero, DontCare, Zero, One]);
        let stats = share_latches(&mut graph, None).unwrap();
        assert_eq!(stats.buffers, 1);
        assert_eq!(stats.latches_saved, 2);
        assert_eq!(graph.latch_count(), 2);
        // The stem now drives the buffer and the lone `1` latch.
        assert_eq!(graph.fanouts(a).len(), 2);
    }

    #[test]
    fn dont_cares_join_ones_without_zeros() {
        let (mut graph, _) = fanout(&[DontCare, One, DontCare]);
        let stats = share_latches(&mut graph, None).unwrap();
        assert_eq!(stats.latches_saved, 2);
        assert_eq!(graph.latch_count(), 1);
        let merged: Vec<_> = graph
            .edge_ids()
            .filter(|&e| graph.edge(e).latch_count() == 1)
            .map(|e| graph.edge(e).ring().values())
            .collect();
        assert_eq!(merged, vec![vec![One]]);
    }

    #[test]
    fn opposite_values_stay_apart() {
        let (mut graph, _) = fanout(&[Zero, One]);
        let stats = share_latches(&mut graph, None).unwrap();
        assert_eq!(stats, ShareStats::default());
        assert_eq!(graph.latch_count(), 2);
    }

    /// `a` feeds two gates through `0` latches; each gate drives an output.
    fn gated_fanout() -> RetimeGraph {
        let mut net = SeqNetwork::new("gated");
        let one = net.add_const();
        let a = net.add_input("a");
        for i in 0..2 {
            let g = net.add_and(Signal::positive(a), Signal::positive(one));
            net.add_latch(g, 0, Zero);
            net.add_output(format!("o{i}"), Signal::positive(g));
        }
        RetimeGraph::from_network(&net).unwrap()
    }

    #[test]
    fn buffer_must_fit_the_period() {
        let mut graph = gated_fanout();
        let stats = share_latches(&mut graph, Some(1.0)).unwrap();
        assert_eq!(stats.buffers, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(graph.latch_count(), 2);

        let mut graph = gated_fanout();
        let stats = share_latches(&mut graph, Some(2.0)).unwrap();
        assert_eq!(stats.buffers, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(graph.latch_count(), 1);
        let path = crate::search::achieved_period(&graph).unwrap();
        assert_eq!(path, 2.0);
    }

    #[test]
    fn buffer_behind_remaining_latches_is_free() {
        let mut net = SeqNetwork::new("deep_gated");
        let one = net.add_const();
        let a = net.add_input("a");
        for i in 0..2 {
            let g = net.add_and(Signal::positive(a), Signal::positive(one));
            net.add_latch(g, 0, One);
            net.add_latch(g, 0, Zero);
            net.add_output(format!("o{i}"), Signal::positive(g));
        }
        let mut graph = RetimeGraph::from_network(&net).unwrap();
        let stats = share_latches(&mut graph, Some(1.0)).unwrap();
        // The `0` latches merge; the `1` latches behind them would leave the
        // second buffer directly in front of the gates.
        assert_eq!(stats.buffers, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(graph.latch_count(), 3);
        assert_eq!(crate::search::achieved_period(&graph).unwrap(), 1.0);
    }

    #[test]
    fn deeper_latches_merge_through_buffers() {
        let mut net = SeqNetwork::new("deep");
        let a = net.add_input("a");
        for i in 0..2 {
            let o = net.add_output(format!("o{i}"), Signal::positive(a));
            net.add_latch(o, 0, One);
            net.add_latch(o, 0, Zero);
        }
        let mut graph = RetimeGraph::from_network(&net).unwrap();
        let stats = share_latches(&mut graph, None).unwrap();
        assert_eq!(stats.buffers, 2);
        assert_eq!(graph.latch_count(), 2);
        assert!(graph.to_network().unwrap().validate().is_ok());
    }
}
