//! Parsing and validation of `inkstone.toml` configuration files.
//!
//! This crate reads the toolchain configuration and produces a strongly-typed
//! [`InkstoneConfig`] describing where resources live, which naming
//! conventions exist, and how artifacts are built.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config, CONFIG_FILE};
pub use types::*;
