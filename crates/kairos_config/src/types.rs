//! Configuration types deserialized from `kairos.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The top-level configuration parsed from `kairos.toml`.
///
/// Every section is optional; missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KairosConfig {
    /// Period search and scheduling settings.
    #[serde(default)]
    pub retime: RetimeSection,
    /// Backward-retiming legalization settings.
    #[serde(default)]
    pub legalize: LegalizeSection,
    /// Mapping-aware retiming settings.
    #[serde(default)]
    pub mapping: MappingSection,
    /// Latch-sharing post-pass settings.
    #[serde(default)]
    pub sharing: SharingSection,
    /// Named profiles overriding the base sections.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileOverrides>,
}

/// The `[retime]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetimeSection {
    /// Relaxation sweep budget per feasibility test. Defaults to the node count plus one.
    pub max_sweeps: Option<usize>,
    /// Tolerance for L-value comparisons.
    pub epsilon: f64,
    /// Binary-search termination width in the unit-delay model.
    pub resolution: f64,
    /// Slack added to the acyclic upper bound.
    pub margin: f64,
    /// Seed the lower bound from the maximum cycle ratio.
    pub use_cycle_bound: bool,
    /// Only move latches forward.
    pub forward_only: bool,
    /// Emit informational diagnostics.
    pub verbose: bool,
}

impl Default for RetimeSection {
    fn default() -> Self {
        Self {
            max_sweeps: None,
            epsilon: 1e-6,
            resolution: 1.0,
            margin: 0.0,
            use_cycle_bound: false,
            forward_only: false,
            verbose: false,
        }
    }
}

/// The `[legalize]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalizeSection {
    /// Resolve backward-retiming initial states with a SAT call.
    pub enabled: bool,
    /// Largest CNF (in clauses) submitted to the solver before reporting a timeout.
    pub sat_clause_budget: usize,
}

impl Default for LegalizeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            sat_clause_budget: 1_000_000,
        }
    }
}

/// The `[mapping]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSection {
    /// Maximum cut size K requested from the cut oracle.
    pub cut_size: usize,
    /// Binary-search termination width for library delays.
    pub resolution: f64,
}

impl Default for MappingSection {
    fn default() -> Self {
        Self {
            cut_size: 4,
            resolution: 0.05,
        }
    }
}

/// The `[sharing]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingSection {
    /// Run the latch-sharing post-pass.
    pub enabled: bool,
}

impl Default for SharingSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A `[profiles.<name>]` table. Every field is optional and overrides the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileOverrides {
    /// Overrides `retime.max_sweeps`.
    pub max_sweeps: Option<usize>,
    /// Overrides `retime.epsilon`.
    pub epsilon: Option<f64>,
    /// Overrides `retime.resolution`.
    pub resolution: Option<f64>,
    /// Overrides `retime.margin`.
    pub margin: Option<f64>,
    /// Overrides `retime.use_cycle_bound`.
    pub use_cycle_bound: Option<bool>,
    /// Overrides `retime.forward_only`.
    pub forward_only: Option<bool>,
    /// Overrides `retime.verbose`.
    pub verbose: Option<bool>,
    /// Overrides `legalize.enabled`.
    pub legalize: Option<bool>,
    /// Overrides `legalize.sat_clause_budget`.
    pub sat_clause_budget: Option<usize>,
    /// Overrides `mapping.cut_size`.
    pub cut_size: Option<usize>,
    /// Overrides `mapping.resolution`.
    pub mapping_resolution: Option<f64>,
    /// Overrides `sharing.enabled`.
    pub share: Option<bool>,
}
