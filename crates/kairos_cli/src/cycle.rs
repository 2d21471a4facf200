//! The `kairos cycle` command.
//!
//! Prints the critical cycle of the unit-delay view: the loop whose delay
//! over latch count bounds every retiming from below.

use std::path::Path;

use kairos_diagnostics::DiagnosticSink;
use kairos_retime::RetimeGraph;
use kairos_timing::max_cycle_ratio;

use crate::pipeline;
use crate::{CycleArgs, GlobalArgs};

/// Runs the cycle command. Returns the exit code.
pub fn run(args: &CycleArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let network = pipeline::read_network(Path::new(&args.input))?;
    let graph = match RetimeGraph::from_network(&network) {
        Ok(graph) => graph,
        Err(err) => {
            let sink = DiagnosticSink::new();
            sink.emit(err.to_diagnostic());
            pipeline::render_diagnostics(&sink, global);
            return Ok(1);
        }
    };

    let timing = graph.cycle_graph();
    match max_cycle_ratio(&timing)? {
        Some(critical) => {
            let names: Vec<&str> = critical
                .cycle
                .iter()
                .map(|&id| timing.node(id).name.as_str())
                .collect();
            println!(
                "critical cycle: ratio {} ({} delay over {} latches)",
                critical.ratio, critical.delay, critical.latches
            );
            println!("  {}", names.join(" -> "));
        }
        None => println!("no cycles: the period is bounded by the longest path only"),
    }
    Ok(0)
}
