//! Parsing and validation of `kairos.toml` retiming configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`KairosConfig`]. Named profiles are merged over the base sections by
//! [`resolve_profile`] into the flat [`RetimeOptions`] consumed by the engine.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_base, resolve_profile, RetimeOptions};
pub use types::*;
