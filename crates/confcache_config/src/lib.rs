//! Parsing and validation of `confcache.toml` build model parameters.
//!
//! This crate reads the configuration file and produces strongly-typed
//! [`BuildModelParameters`] that decide whether the configuration cache is
//! enabled and at which granularity stored state may be reused.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
