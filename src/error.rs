//! Error handling module
//!
//! This module provides unified error handling for the dual-bench harness.
//!
//! Only configuration problems, unknown benchmark names, malformed metadata and
//! provisioning failures surface here. Per-run and per-side failures are
//! recorded in the data model instead (see [`crate::runner::RunOutcome`] and
//! [`crate::stats::SideSummary`]).

use std::path::PathBuf;

/// Result type alias for the harness
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors, including environments that are not provisioned
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A requested benchmark is not part of the catalog
    #[error("Benchmark not found: {name} (available: {})", format_available(.available))]
    NotFound {
        name: String,
        available: Vec<String>,
    },

    /// A benchmark metadata file exists but cannot be parsed
    #[error("Invalid benchmark metadata in {}: {message}", .path.display())]
    InvalidMetadata { path: PathBuf, message: String },

    /// Result document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An environment could not be created or its package not installed
    #[error("Provisioning failed: {0}")]
    Provisioning(String),
}

impl Error {
    /// Create a not-found error carrying the names that do exist
    pub fn not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        Error::NotFound {
            name: name.into(),
            available,
        }
    }

    /// Create a provisioning error with a custom message
    pub fn provisioning_error(message: String) -> Self {
        Error::Provisioning(message)
    }
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_owned()
    } else {
        available.join(", ")
    }
}
