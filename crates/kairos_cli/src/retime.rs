//! The `kairos retime` command.
//!
//! Retimes a network for the minimum clock period and writes the result.

use std::path::Path;

use kairos_retime::{Phase, RetimeStats, Retimer};
use serde::Serialize;

use crate::pipeline;
use crate::{GlobalArgs, RetimeArgs};

/// What `--summary` writes.
#[derive(Serialize)]
struct Summary<'a> {
    network: &'a str,
    period: f64,
    initial_state_exact: bool,
    phases: &'a [Phase],
    stats: &'a RetimeStats,
}

/// Runs the retime command. Returns the exit code.
pub fn run(args: &RetimeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    // Step 1: Resolve options, letting flags override the config
    let mut options = pipeline::resolve_options(global, args.profile.as_deref())?;
    options.forward_only |= args.forward_only;
    if args.no_share {
        options.share = false;
    }
    if args.no_legalize {
        options.legalize = false;
    }

    // Step 2: Read the network
    let network = pipeline::read_network(Path::new(&args.input))?;

    // Step 3: Retime
    let sink = pipeline::make_sink(&options, global);
    let result = Retimer::new(options).run(&network, &sink);
    pipeline::render_diagnostics(&sink, global);
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(_) => return Ok(1),
    };

    // Step 4: Write the result
    pipeline::write_network(&outcome.network, args.output.as_deref().map(Path::new))?;
    if let Some(path) = &args.summary {
        let summary = Summary {
            network: &outcome.network.name,
            period: outcome.period,
            initial_state_exact: outcome.initial_state_exact,
            phases: &outcome.phases,
            stats: &outcome.stats,
        };
        std::fs::write(path, serde_json::to_string_pretty(&summary)? + "\n")?;
    }

    if !global.quiet {
        eprintln!(
            "   Retimed {} to period {} ({} -> {} latches{})",
            outcome.network.name,
            outcome.period,
            outcome.stats.latches_before,
            outcome.stats.latches_after,
            if outcome.initial_state_exact {
                ""
            } else {
                ", initial state relaxed"
            }
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::InitValue;
    use kairos_ir::{SeqNetwork, Signal};

    fn chain() -> SeqNetwork {
        let mut net = SeqNetwork::new("chain3");
        let one = net.add_const();
        let pi = net.add_input("pi");
        let a = net.add_and(Signal::positive(pi), Signal::positive(one));
        let b = net.add_and(Signal::positive(a), Signal::positive(one));
        let c = net.add_and(Signal::positive(b), Signal::positive(one));
        let po = net.add_output("po", Signal::positive(c));
        net.add_latch(po, 0, InitValue::Zero);
        net
    }

    fn args(dir: &Path) -> RetimeArgs {
        RetimeArgs {
            input: dir.join("in.json").to_string_lossy().into_owned(),
            output: Some(dir.join("out.json").to_string_lossy().into_owned()),
            summary: Some(dir.join("summary.json").to_string_lossy().into_owned()),
            profile: None,
            forward_only: false,
            no_share: false,
            no_legalize: false,
        }
    }

    fn global(dir: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(dir.to_string_lossy().into_owned()),
        }
    }

    #[test]
    fn retime_writes_network_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        pipeline::write_network(&chain(), Some(&dir.path().join("in.json"))).unwrap();

        let code = run(&args(dir.path()), &global(dir.path())).unwrap();
        assert_eq!(code, 0);

        let out = pipeline::read_network(&dir.path().join("out.json")).unwrap();
        assert_eq!(out.latch_count(), 1);

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["period"], 2.0);
        assert_eq!(summary["initial_state_exact"], true);
        assert_eq!(summary["phases"][0], "build_graph");
    }

    #[test]
    fn forward_only_flag_keeps_the_period() {
        let dir = tempfile::tempdir().unwrap();
        pipeline::write_network(&chain(), Some(&dir.path().join("in.json"))).unwrap();
        let mut a = args(dir.path());
        a.forward_only = true;

        assert_eq!(run(&a, &global(dir.path())).unwrap(), 0);
        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["period"], 3.0);
    }

    #[test]
    fn latch_free_loop_fails_with_exit_code() {
        let mut net = SeqNetwork::new("loop");
        let pi = net.add_input("pi");
        let a = net.add_and(Signal::positive(pi), Signal::positive(pi));
        let b = net.add_and(Signal::positive(a), Signal::positive(pi));
        net.set_fanin(a, 1, Signal::positive(b));
        net.add_output("po", Signal::positive(b));

        let dir = tempfile::tempdir().unwrap();
        pipeline::write_network(&net, Some(&dir.path().join("in.json"))).unwrap();
        assert_eq!(run(&args(dir.path()), &global(dir.path())).unwrap(), 1);
        assert!(!dir.path().join("out.json").exists());
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&args(dir.path()), &global(dir.path())).is_err());
    }
}
