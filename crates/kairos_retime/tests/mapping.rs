//! Mapping-aware retiming with lookup tables and standard cells.

mod common;

use common::{and_chain, assert_refines, chain, CellLibrary, LutLibrary, SeqCuts};
use kairos_common::InitValue::{One, Zero};
use kairos_config::RetimeOptions;
use kairos_diagnostics::DiagnosticSink;
use kairos_ir::{NodeKind, Polarity, SeqNetwork, Signal};
use kairos_retime::{codes, RetimeError, Retimer};

fn bound_gates(net: &SeqNetwork) -> Vec<String> {
    net.nodes()
        .filter_map(|(_, node)| node.binding.as_ref().map(|b| b.gate.clone()))
        .collect()
}

#[test]
fn lut_collapses_a_buffer_chain() {
    let (net, _) = chain(3, &[Zero]);
    let cuts = SeqCuts::new(&net);
    let lib = LutLibrary { k: 4 };
    let sink = DiagnosticSink::new();
    let outcome = Retimer::new(RetimeOptions::default())
        .with_mapping(&cuts, &lib)
        .run(&net, &sink)
        .unwrap();

    assert_eq!(outcome.period, 1.0);
    assert_eq!(outcome.stats.mapped_area, Some(1.0));
    assert_eq!(bound_gates(&outcome.network), vec!["LUT1".to_string()]);
    assert_eq!(outcome.network.latch_count(), 1);
    assert_refines(&net, &outcome.network, 11, 16);
}

#[test]
fn lut_mapping_moves_latches_into_the_cover() {
    let (net, _) = and_chain(4, &[One, One]);
    let cuts = SeqCuts::new(&net);
    let lib = LutLibrary { k: 3 };
    let sink = DiagnosticSink::new();
    let outcome = Retimer::new(RetimeOptions::default())
        .with_mapping(&cuts, &lib)
        .run(&net, &sink)
        .unwrap();

    assert_eq!(outcome.period, 1.0);
    assert_eq!(outcome.stats.backward.moves, 2);
    assert_eq!(outcome.stats.mapped_area, Some(2.0));
    assert!(outcome.initial_state_exact);
    let mut gates = bound_gates(&outcome.network);
    gates.sort();
    assert_eq!(gates, vec!["LUT3".to_string(), "LUT3".to_string()]);
    assert_refines(&net, &outcome.network, 12, 24);

    // The same network without mapping needs two unit gates per stage.
    let plain = Retimer::new(RetimeOptions::default())
        .run(&net, &DiagnosticSink::new())
        .unwrap();
    assert_eq!(plain.period, 2.0);
}

#[test]
fn cells_pick_the_faster_phase() {
    let mut net = SeqNetwork::new("nand");
    let x = net.add_input("x");
    let y = net.add_input("y");
    let g = net.add_and(Signal::positive(x), Signal::positive(y));
    net.set_name(g, "g");
    let po = net.add_output("po", Signal::negative(g));
    net.add_latch(po, 0, Zero);

    let cuts = SeqCuts::new(&net);
    let lib = CellLibrary::default();
    let sink = DiagnosticSink::with_verbosity(true);
    let outcome = Retimer::new(RetimeOptions::default())
        .with_mapping(&cuts, &lib)
        .run(&net, &sink)
        .unwrap();

    assert!(outcome.period >= 0.8 - 1e-9);
    assert!(outcome.period <= 0.8 + 0.05 + 1e-9);
    assert_eq!(bound_gates(&outcome.network), vec!["NAND2".to_string()]);
    let root = outcome
        .network
        .nodes()
        .find(|(_, node)| node.binding.is_some())
        .map(|(_, node)| node.clone())
        .unwrap();
    assert_eq!(root.name.as_deref(), Some("g_n"));
    let binding = root.binding.unwrap();
    assert_eq!(binding.output_phase, Polarity::Negative);
    assert_eq!(binding.inputs.len(), 2);
    assert!(sink
        .diagnostics()
        .iter()
        .any(|d| d.code == codes::MAPPING_COVER));
    assert_refines(&net, &outcome.network, 13, 16);
}

#[test]
fn negated_input_maps_to_an_inverter_cell() {
    let mut net = SeqNetwork::new("inv");
    let one = net.add_const();
    let x = net.add_input("x");
    let g = net.add_and(Signal::negative(x), Signal::positive(one));
    net.set_name(g, "g");
    net.add_output("po", Signal::positive(g));

    let cuts = SeqCuts::new(&net);
    let lib = CellLibrary::default();
    let sink = DiagnosticSink::new();
    let outcome = Retimer::new(RetimeOptions::default())
        .with_mapping(&cuts, &lib)
        .run(&net, &sink)
        .unwrap();

    let gates = bound_gates(&outcome.network);
    assert_eq!(gates, vec!["INV".to_string()]);
    assert!(outcome.period >= 0.5 - 1e-9);
    assert!(outcome.period <= 0.55 + 1e-9);
    assert_eq!(
        outcome
            .network
            .nodes()
            .filter(|(_, node)| node.kind == NodeKind::Input)
            .count(),
        1
    );
    assert_refines(&net, &outcome.network, 14, 8);
}

#[test]
fn slow_complex_gate_loses_to_an_inverter() {
    let mut net = SeqNetwork::new("slow_nand");
    let x = net.add_input("x");
    let y = net.add_input("y");
    let g = net.add_and(Signal::positive(x), Signal::positive(y));
    net.set_name(g, "g");
    let po = net.add_output("po", Signal::negative(g));
    net.add_latch(po, 0, Zero);

    let cuts = SeqCuts::new(&net);
    let lib = CellLibrary {
        and_delay: 1.0,
        nand_delay: 5.0,
        inverter_delay: 0.5,
    };
    let sink = DiagnosticSink::new();
    let outcome = Retimer::new(RetimeOptions::default())
        .with_mapping(&cuts, &lib)
        .run(&net, &sink)
        .unwrap();

    assert!(outcome.period >= 1.0 - 1e-9);
    assert!(outcome.period <= 1.05 + 1e-9);
    let mut gates = bound_gates(&outcome.network);
    gates.sort();
    assert_eq!(gates, vec!["AND2".to_string(), "INV".to_string()]);
    assert_eq!(outcome.stats.mapped_area, Some(2.5));
    // The latch moves between the AND and the inverter.
    assert_eq!(outcome.stats.backward.moves, 1);
    assert!(outcome.initial_state_exact);
    assert_refines(&net, &outcome.network, 15, 16);
}

#[test]
fn too_small_luts_report_no_match() {
    let (net, _) = and_chain(1, &[]);
    let cuts = SeqCuts::new(&net);
    let lib = LutLibrary { k: 1 };
    let sink = DiagnosticSink::new();
    let err = Retimer::new(RetimeOptions::default())
        .with_mapping(&cuts, &lib)
        .run(&net, &sink)
        .unwrap_err();
    assert_eq!(err, RetimeError::NoMatch { node: "g1".to_string() });
    assert_eq!(sink.diagnostics()[0].code, codes::MAPPING_FAILURE);
    assert_eq!(sink.diagnostics()[0].subject.as_deref(), Some("g1"));
}

#[test]
fn forward_only_mapping_refuses_backward_lags() {
    let (net, _) = and_chain(4, &[One, One]);
    let cuts = SeqCuts::new(&net);
    let lib = LutLibrary { k: 3 };
    let options = RetimeOptions {
        forward_only: true,
        ..RetimeOptions::default()
    };
    let sink = DiagnosticSink::new();
    let err = Retimer::new(options)
        .with_mapping(&cuts, &lib)
        .run(&net, &sink)
        .unwrap_err();
    assert!(matches!(err, RetimeError::ForwardOnlyInfeasible { .. }));
    assert!(sink.has_errors());
}
