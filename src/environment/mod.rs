//! Execution environment module
//!
//! The baseline and the candidate tool cannot be installed side by side, so each
//! lives in its own environment: a root directory holding the interpreter or
//! binary used to launch that side's artifacts.
//!
//! - [`ExecutionEnvironment`] describes one side and knows how to launch an artifact
//! - [`EnvironmentRegistry`] holds both sides and gates the measurement loop on readiness
//! - [`provision`] creates environments and installs their package (setup only)

pub mod provision;

use crate::config::ConfigError;
use crate::executor::Invocation;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

pub use provision::{ProvisionPlan, Provisioner};

/// Placeholder replaced by the artifact path in launch arguments
pub const ARTIFACT_PLACEHOLDER: &str = "{artifact}";

/// Placeholder replaced by the resolved side input in launch arguments
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Hint shown when an environment is not ready
pub const SETUP_REMEDIATION: &str = "Run: dual-bench --setup";

/// One of the two compared tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The reference tool being measured against
    Baseline,
    /// The tool under evaluation
    Candidate,
}

impl Side {
    /// Both sides in execution order
    pub const ALL: [Side; 2] = [Side::Baseline, Side::Candidate];

    /// Lowercase name as used in logs and serialized results
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Baseline => "baseline",
            Side::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// An isolated environment able to execute one side's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    side: Side,
    root: PathBuf,
    entry_point: PathBuf,
    args: Vec<String>,
}

impl ExecutionEnvironment {
    /// Create an environment whose entry point is `root/entry_point`
    ///
    /// The launch template defaults to passing the artifact as the only argument.
    pub fn new<R: Into<PathBuf>, E: Into<PathBuf>>(side: Side, root: R, entry_point: E) -> Self {
        Self {
            side,
            root: root.into(),
            entry_point: entry_point.into(),
            args: vec![ARTIFACT_PLACEHOLDER.to_owned()],
        }
    }

    /// Replace the launch-argument template
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Which side this environment serves
    pub fn side(&self) -> Side {
        self.side
    }

    /// Environment root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Launch-argument template
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Absolute (or root-relative) path of the interpreter/binary
    pub fn entry_point_path(&self) -> PathBuf {
        self.root.join(&self.entry_point)
    }

    /// Whether the entry point exists on disk; performs no installation
    pub fn check_ready(&self) -> bool {
        self.entry_point_path().is_file()
    }

    /// Build the invocation that runs `artifact` inside this environment
    pub fn invocation(&self, artifact: &Path, input: Option<&str>) -> Invocation {
        let input = input.unwrap_or_default();
        Invocation::new(self.entry_point_path()).args(
            self.args
                .iter()
                .map(|token| expand_token(token, artifact, input)),
        )
    }
}

fn expand_token(token: &str, artifact: &Path, input: &str) -> OsString {
    if token == ARTIFACT_PLACEHOLDER {
        // Keep non-UTF-8 artifact paths intact when the token is the bare placeholder.
        return artifact.as_os_str().to_owned();
    }
    token
        .replace(ARTIFACT_PLACEHOLDER, &artifact.to_string_lossy())
        .replace(INPUT_PLACEHOLDER, input)
        .into()
}

/// The pair of environments a harness run measures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRegistry {
    baseline: ExecutionEnvironment,
    candidate: ExecutionEnvironment,
}

impl EnvironmentRegistry {
    /// Register the baseline and candidate environments
    ///
    /// Each environment must belong to the slot it is passed in; swapped or
    /// duplicated sides are rejected.
    pub fn new(
        baseline: ExecutionEnvironment,
        candidate: ExecutionEnvironment,
    ) -> Result<Self, ConfigError> {
        if baseline.side() != Side::Baseline || candidate.side() != Side::Candidate {
            return Err(ConfigError::InvalidConfigValue {
                key: "environments".to_owned(),
                value: format!("{}, {}", baseline.side(), candidate.side()),
                expected: "the baseline environment followed by the candidate environment"
                    .to_owned(),
            });
        }
        Ok(Self {
            baseline,
            candidate,
        })
    }

    /// Environment for `side`
    pub fn get(&self, side: Side) -> &ExecutionEnvironment {
        match side {
            Side::Baseline => &self.baseline,
            Side::Candidate => &self.candidate,
        }
    }

    /// Both environments, baseline first
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionEnvironment> {
        [&self.baseline, &self.candidate].into_iter()
    }

    /// Readiness of each side, baseline first
    pub fn readiness(&self) -> Vec<(Side, bool)> {
        self.iter()
            .map(|environment| (environment.side(), environment.check_ready()))
            .collect()
    }

    /// Fail with a configuration error unless both environments are ready
    pub fn require_ready(&self) -> Result<(), ConfigError> {
        let missing: Vec<Side> = self
            .readiness()
            .into_iter()
            .filter(|(_, ready)| !ready)
            .map(|(side, _)| side)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        for side in &missing {
            tracing::debug!(
                "{side} entry point missing: {}",
                self.get(*side).entry_point_path().display()
            );
        }

        Err(ConfigError::EnvironmentNotReady {
            missing,
            remediation: SETUP_REMEDIATION.to_owned(),
        })
    }
}
