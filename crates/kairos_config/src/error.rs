//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `kairos.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A referenced profile name does not exist in the configuration.
    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    /// A configuration value failed validation.
    #[error("invalid value for {field}: {reason}")]
    ValidationError {
        /// The dotted path of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a validation error for a dotted field path.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_profile() {
        let err = ConfigError::UnknownProfile("turbo".to_string());
        assert_eq!(format!("{err}"), "unknown profile 'turbo'");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::invalid("mapping.cut_size", "must be between 2 and 6");
        assert_eq!(
            format!("{err}"),
            "invalid value for mapping.cut_size: must be between 2 and 6"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
