//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::KairosConfig;
use std::path::Path;

/// The configuration file name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "kairos.toml";

/// Loads and validates a `kairos.toml` configuration from a directory.
///
/// A missing file is not an error: the defaults are returned instead.
pub fn load_config(dir: &Path) -> Result<KairosConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(KairosConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<KairosConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kairos.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KairosConfig, ConfigError> {
    let config: KairosConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that the base sections hold usable values.
///
/// Profiles are validated after merging, in [`resolve_profile`](crate::resolve_profile).
fn validate_config(config: &KairosConfig) -> Result<(), ConfigError> {
    let r = &config.retime;
    check_positive("retime.epsilon", r.epsilon)?;
    check_positive("retime.resolution", r.resolution)?;
    check_non_negative("retime.margin", r.margin)?;
    if r.max_sweeps == Some(0) {
        return Err(ConfigError::invalid("retime.max_sweeps", "must be at least 1"));
    }
    check_cut_size("mapping.cut_size", config.mapping.cut_size)?;
    check_positive("mapping.resolution", config.mapping.resolution)?;
    Ok(())
}

pub(crate) fn check_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

pub(crate) fn check_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be non-negative, got {value}")))
    }
}

pub(crate) fn check_cut_size(field: &str, value: usize) -> Result<(), ConfigError> {
    if (2..=6).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be between 2 and 6, got {value}")))
    }
}
