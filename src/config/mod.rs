//! Configuration module for dual-bench
//!
//! This module provides a unified configuration system that combines CLI arguments
//! with an optional TOML config file using strict error handling and clear priority logic.
//!
//! # Architecture
//!
//! - [`file_config`] - Parsing of the optional `dual-bench.toml` file
//! - [`harness_config`] - The immutable [`HarnessConfig`] and its layered builder
//! - [`error`] - [`ConfigError`], shared by every layer
//!
//! # Priority Logic
//!
//! Configuration values are resolved with the following priority:
//!
//! 1. CLI parameters (highest priority)
//! 2. Config file values
//! 3. Built-in defaults
//!
//! Invalid values are errors at every layer; nothing silently falls back to a
//! default once a value was given.
//!
//! # Usage
//!
//! ```rust
//! use dual_bench::config::{CliArgs, HarnessConfig};
//!
//! let cli_args = CliArgs {
//!     runs: Some(5),
//!     ..CliArgs::default()
//! };
//!
//! let config = HarnessConfig::from_cli(cli_args)?;
//! assert_eq!(config.runs(), 5);
//!
//! let catalog = config.catalog();
//! let registry = config.registry();
//! # let _ = (catalog, registry);
//! # Ok::<(), dual_bench::ConfigError>(())
//! ```

pub mod error;
pub mod file_config;
pub mod harness_config;

pub use error::ConfigError;
pub use file_config::{EnvironmentOverrides, FileConfig, DEFAULT_CONFIG_FILE};
pub use harness_config::{
    CliArgs, ConfigBuilder, EnvironmentSettings, HarnessConfig, DEFAULT_CATALOG, DEFAULT_RUNS,
};
