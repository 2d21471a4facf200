//! Kairos CLI, the command-line front end for the retiming engine.
//!
//! Provides `kairos retime` to retime a network for the minimum clock
//! period, `kairos period` to report the achievable period and lags without
//! touching the network, and `kairos cycle` to report the critical cycle.
//! Networks are read and written as JSON.

#![warn(missing_docs)]

mod cycle;
mod period;
mod pipeline;
mod retime;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Kairos, sequential retiming for AND networks.
#[derive(Parser, Debug)]
#[command(name = "kairos", version, about = "Kairos sequential retiming")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show informational diagnostics.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `kairos.toml` file or to the directory holding it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Retime a network for the minimum clock period.
    Retime(RetimeArgs),
    /// Report the current and the minimum achievable period.
    Period(PeriodArgs),
    /// Report the maximum cycle ratio.
    Cycle(CycleArgs),
}

/// Arguments for the `kairos retime` subcommand.
#[derive(Parser, Debug)]
pub struct RetimeArgs {
    /// Input network (JSON).
    pub input: String,

    /// Where to write the retimed network. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Where to write a JSON summary of the run.
    #[arg(long)]
    pub summary: Option<String>,

    /// Configuration profile to apply.
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Only move latches forward.
    #[arg(long)]
    pub forward_only: bool,

    /// Skip the latch-sharing pass.
    #[arg(long)]
    pub no_share: bool,

    /// Skip initial-state legalization; pending latches become don't-care.
    #[arg(long)]
    pub no_legalize: bool,
}

/// Arguments for the `kairos period` subcommand.
#[derive(Parser, Debug)]
pub struct PeriodArgs {
    /// Input network (JSON).
    pub input: String,

    /// Configuration profile to apply.
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Print the lag of every node, not only the non-zero ones.
    #[arg(long)]
    pub all: bool,
}

/// Arguments for the `kairos cycle` subcommand.
#[derive(Parser, Debug)]
pub struct CycleArgs {
    /// Input network (JSON).
    pub input: String,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to show informational diagnostics.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a config file or directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var("TERM").is_ok_and(|t| t != "dumb"),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Retime(ref args) => retime::run(args, &global),
        Command::Period(ref args) => period::run(args, &global),
        Command::Cycle(ref args) => cycle::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_retime_default() {
        let cli = Cli::parse_from(["kairos", "retime", "net.json"]);
        match cli.command {
            Command::Retime(ref args) => {
                assert_eq!(args.input, "net.json");
                assert!(args.output.is_none());
                assert!(args.summary.is_none());
                assert!(args.profile.is_none());
                assert!(!args.forward_only);
                assert!(!args.no_share);
                assert!(!args.no_legalize);
            }
            _ => panic!("expected Retime command"),
        }
    }

    #[test]
    fn parse_retime_with_args() {
        let cli = Cli::parse_from([
            "kairos",
            "retime",
            "net.json",
            "-o",
            "out.json",
            "--profile",
            "fast",
            "--forward-only",
            "--no-share",
            "--no-legalize",
            "--summary",
            "stats.json",
        ]);
        match cli.command {
            Command::Retime(ref args) => {
                assert_eq!(args.output.as_deref(), Some("out.json"));
                assert_eq!(args.profile.as_deref(), Some("fast"));
                assert_eq!(args.summary.as_deref(), Some("stats.json"));
                assert!(args.forward_only);
                assert!(args.no_share);
                assert!(args.no_legalize);
            }
            _ => panic!("expected Retime command"),
        }
    }

    #[test]
    fn parse_period() {
        let cli = Cli::parse_from(["kairos", "period", "net.json", "--all"]);
        match cli.command {
            Command::Period(ref args) => {
                assert_eq!(args.input, "net.json");
                assert!(args.all);
            }
            _ => panic!("expected Period command"),
        }
    }

    #[test]
    fn parse_cycle() {
        let cli = Cli::parse_from(["kairos", "cycle", "net.json"]);
        assert!(matches!(cli.command, Command::Cycle(_)));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["kairos", "--quiet", "--color", "never", "cycle", "n.json"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["kairos", "--config", "/tmp/kairos.toml", "period", "n.json"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/kairos.toml"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kairos", "retime", "n.json", "--verbose"]);
        assert!(cli.verbose);
    }
}
