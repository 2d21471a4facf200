//! Shared helpers for CLI commands.
//!
//! Contains the steps every command needs: option resolution from
//! `kairos.toml`, network I/O, and diagnostic rendering.

use std::path::{Path, PathBuf};

use kairos_config::{load_config, load_config_file, resolve_base, resolve_profile, RetimeOptions};
use kairos_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use kairos_ir::SeqNetwork;

use crate::GlobalArgs;

/// Resolves the retiming options.
///
/// `--config` may name a file or a directory; without it the current
/// directory is searched. A missing `kairos.toml` yields the defaults.
pub fn resolve_options(
    global: &GlobalArgs,
    profile: Option<&str>,
) -> Result<RetimeOptions, Box<dyn std::error::Error>> {
    let config = match &global.config {
        Some(path) => {
            let p = PathBuf::from(path);
            if p.is_dir() {
                load_config(&p)?
            } else {
                load_config_file(&p)?
            }
        }
        None => load_config(&std::env::current_dir()?)?,
    };
    let mut options = match profile {
        Some(name) => resolve_profile(&config, name)?,
        None => resolve_base(&config),
    };
    options.verbose |= global.verbose;
    Ok(options)
}

/// Reads a network from a JSON file.
///
/// Structural checks are left to the retimer, which reports them as
/// diagnostics.
pub fn read_network(path: &Path) -> Result<SeqNetwork, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let network: SeqNetwork = serde_json::from_str(&text)
        .map_err(|e| format!("cannot parse {}: {e}", path.display()))?;
    Ok(network)
}

/// Writes a network as pretty JSON to `path`, or to stdout.
pub fn write_network(
    network: &SeqNetwork,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = serde_json::to_string_pretty(network)?;
    match path {
        Some(p) => std::fs::write(p, text + "\n")?,
        None => println!("{text}"),
    }
    Ok(())
}

/// A sink matching the verbosity flags.
pub fn make_sink(options: &RetimeOptions, global: &GlobalArgs) -> DiagnosticSink {
    DiagnosticSink::with_verbosity(options.verbose && !global.quiet)
}

/// Renders every collected diagnostic to stderr. Errors are shown even
/// when quiet. Returns the number of errors.
pub fn render_diagnostics(sink: &DiagnosticSink, global: &GlobalArgs) -> usize {
    let renderer = TerminalRenderer::new(global.color, 100);
    let diagnostics = sink.take_all();
    let mut errors = 0;
    for diag in &diagnostics {
        if diag.severity.is_error() {
            errors += 1;
        } else if global.quiet {
            continue;
        }
        eprint!("{}", renderer.render(diag));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_ir::Signal;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
        }
    }

    #[test]
    fn options_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kairos.toml"),
            "[retime]\nmargin = 2.0\n\n[profiles.fast]\nshare = false\n",
        )
        .unwrap();
        let g = global(Some(dir.path().to_string_lossy().into_owned()));

        let base = resolve_options(&g, None).unwrap();
        assert_eq!(base.margin, 2.0);
        assert!(base.share);

        let fast = resolve_options(&g, Some("fast")).unwrap();
        assert!(!fast.share);
        assert_eq!(fast.margin, 2.0);

        assert!(resolve_options(&g, Some("missing")).is_err());
    }

    #[test]
    fn options_from_file_and_verbose_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[legalize]\nenabled = false\n").unwrap();
        let mut g = global(Some(path.to_string_lossy().into_owned()));
        g.verbose = true;
        let options = resolve_options(&g, None).unwrap();
        assert!(!options.legalize);
        assert!(options.verbose);
    }

    #[test]
    fn network_round_trip_through_disk() {
        let mut net = SeqNetwork::new("wire");
        let a = net.add_input("a");
        net.add_output("o", Signal::negative(a));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        write_network(&net, Some(&path)).unwrap();
        let back = read_network(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.name, "wire");
    }

    #[test]
    fn malformed_network_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_network(&path).unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }
}
