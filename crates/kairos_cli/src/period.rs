//! The `kairos period` command.
//!
//! Reports the period of the network as given and the minimum period a
//! retiming can reach, along with the lags that reach it.

use std::path::Path;

use kairos_retime::{search, RetimeGraph, Retimer};

use crate::pipeline;
use crate::{GlobalArgs, PeriodArgs};

/// Runs the period command. Returns the exit code.
pub fn run(args: &PeriodArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let options = pipeline::resolve_options(global, args.profile.as_deref())?;
    let network = pipeline::read_network(Path::new(&args.input))?;
    let sink = pipeline::make_sink(&options, global);

    let current = RetimeGraph::from_network(&network).and_then(|g| search::achieved_period(&g));
    let report = Retimer::new(options).analyze(&network, &sink);
    pipeline::render_diagnostics(&sink, global);

    let (current, report) = match (current, report) {
        (Ok(current), Ok(report)) => (current, report),
        _ => return Ok(1),
    };

    println!("current period: {current}");
    println!("minimum period: {}", report.period);
    println!(
        "search bracket: [{}, {}] after {} feasibility tests",
        report.lower, report.upper, report.feasibility_tests
    );
    for (node, lag) in &report.lags {
        if *lag != 0 || args.all {
            println!("  lag {}: {lag}", network.label(*node));
        }
    }
    Ok(0)
}
