//! Profile resolution: merging a named profile over the base sections.

use crate::error::ConfigError;
use crate::loader::{check_cut_size, check_non_negative, check_positive};
use crate::types::{KairosConfig, ProfileOverrides};

/// The flat, fully resolved option set consumed by the retiming engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RetimeOptions {
    /// Relaxation sweep budget; `None` means node count plus one.
    pub max_sweeps: Option<usize>,
    /// Tolerance for L-value comparisons.
    pub epsilon: f64,
    /// Search resolution in the unit-delay model.
    pub resolution: f64,
    /// Slack added to the acyclic upper bound.
    pub margin: f64,
    /// Seed the lower bound from the maximum cycle ratio.
    pub use_cycle_bound: bool,
    /// Only move latches forward.
    pub forward_only: bool,
    /// Emit informational diagnostics.
    pub verbose: bool,
    /// Run backward-retiming legalization.
    pub legalize: bool,
    /// Clause budget for the legalization SAT call.
    pub sat_clause_budget: usize,
    /// Maximum cut size for mapping-aware retiming.
    pub cut_size: usize,
    /// Search resolution for mapping-aware retiming.
    pub mapping_resolution: f64,
    /// Run the latch-sharing post-pass.
    pub share: bool,
}

impl Default for RetimeOptions {
    fn default() -> Self {
        resolve_base(&KairosConfig::default())
    }
}

/// Flattens the base sections without applying any profile.
pub fn resolve_base(config: &KairosConfig) -> RetimeOptions {
    RetimeOptions {
        max_sweeps: config.retime.max_sweeps,
        epsilon: config.retime.epsilon,
        resolution: config.retime.resolution,
        margin: config.retime.margin,
        use_cycle_bound: config.retime.use_cycle_bound,
        forward_only: config.retime.forward_only,
        verbose: config.retime.verbose,
        legalize: config.legalize.enabled,
        sat_clause_budget: config.legalize.sat_clause_budget,
        cut_size: config.mapping.cut_size,
        mapping_resolution: config.mapping.resolution,
        share: config.sharing.enabled,
    }
}

/// Resolves a named profile by overlaying its fields on the base sections.
///
/// The merged result is validated again, since a profile may set values the
/// base validation never saw.
pub fn resolve_profile(config: &KairosConfig, name: &str) -> Result<RetimeOptions, ConfigError> {
    let profile = config
        .profiles
        .get(name)
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;

    let mut options = resolve_base(config);
    apply(&mut options, profile);
    validate_options(&options)?;
    Ok(options)
}

fn apply(options: &mut RetimeOptions, p: &ProfileOverrides) {
    if p.max_sweeps.is_some() {
        options.max_sweeps = p.max_sweeps;
    }
    if let Some(v) = p.epsilon {
        options.epsilon = v;
    }
    if let Some(v) = p.resolution {
        options.resolution = v;
    }
    if let Some(v) = p.margin {
        options.margin = v;
    }
    if let Some(v) = p.use_cycle_bound {
        options.use_cycle_bound = v;
    }
    if let Some(v) = p.forward_only {
        options.forward_only = v;
    }
    if let Some(v) = p.verbose {
        options.verbose = v;
    }
    if let Some(v) = p.legalize {
        options.legalize = v;
    }
    if let Some(v) = p.sat_clause_budget {
        options.sat_clause_budget = v;
    }
    if let Some(v) = p.cut_size {
        options.cut_size = v;
    }
    if let Some(v) = p.mapping_resolution {
        options.mapping_resolution = v;
    }
    if let Some(v) = p.share {
        options.share = v;
    }
}

fn validate_options(o: &RetimeOptions) -> Result<(), ConfigError> {
    check_positive("epsilon", o.epsilon)?;
    check_positive("resolution", o.resolution)?;
    check_non_negative("margin", o.margin)?;
    check_cut_size("cut_size", o.cut_size)?;
    check_positive("mapping_resolution", o.mapping_resolution)?;
    if o.max_sweeps == Some(0) {
        return Err(ConfigError::invalid("max_sweeps", "must be at least 1"));
    }
    Ok(())
}
