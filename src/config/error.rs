//! Configuration error type

use crate::environment::Side;
use std::path::PathBuf;

/// Configuration errors; all of them stop the harness before anything executes
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// One or both environments are not provisioned
    #[error("Missing environment(s): {}. {remediation}", format_sides(.missing))]
    EnvironmentNotReady {
        missing: Vec<Side>,
        remediation: String,
    },
    /// Config file could not be parsed
    #[error("Invalid config file {}: {message}", .path.display())]
    InvalidConfigFile { path: PathBuf, message: String },
    /// Config file value is out of range
    #[error("Invalid config value: {key}='{value}' (expected: {expected})")]
    InvalidConfigValue {
        key: String,
        value: String,
        expected: String,
    },
    /// Invalid CLI argument value
    #[error("Invalid CLI argument: {argument}='{value}' (expected: {expected})")]
    InvalidCliArgument {
        argument: String,
        value: String,
        expected: String,
    },
    /// IO error during configuration
    #[error("IO error during configuration: {detail}")]
    IoError { detail: String },
}

fn format_sides(sides: &[Side]) -> String {
    sides
        .iter()
        .map(|side| side.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
