//! Config file module
//!
//! Reads the optional `dual-bench.toml` file. Every key is optional; a missing key
//! falls through to the built-in default. Relative paths are resolved against the
//! directory containing the file so a checked-in config works from any cwd.
//!
//! ```toml
//! catalog = "benchmarks"
//! runs = 5
//! timeout_secs = 300
//!
//! [baseline]
//! root = ".venv-baseline"
//! entry_point = "bin/ansible-playbook"
//! artifact = "playbook.yml"
//!
//! [candidate]
//! root = ".venv-candidate"
//! package = "my-tool"
//! ```

use super::harness_config::EnvironmentSettings;
use super::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "dual-bench.toml";

/// Top-level contents of the config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Catalog root directory
    pub catalog: Option<PathBuf>,
    /// Runs per side
    pub runs: Option<u32>,
    /// Per-run timeout in seconds
    pub timeout_secs: Option<f64>,
    /// Echo the first failing run's diagnostic
    pub verbose_on_first_failure: Option<bool>,
    /// Baseline environment overrides
    pub baseline: Option<EnvironmentOverrides>,
    /// Candidate environment overrides
    pub candidate: Option<EnvironmentOverrides>,
}

/// Per-side overrides; each `Some` replaces the corresponding default
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverrides {
    pub root: Option<PathBuf>,
    pub entry_point: Option<PathBuf>,
    pub args: Option<Vec<String>>,
    pub artifact: Option<String>,
    pub input: Option<String>,
    pub default_input: Option<String>,
    pub package: Option<String>,
    pub create_command: Option<Vec<String>>,
    pub install_command: Option<Vec<String>>,
}

impl FileConfig {
    /// Parse config text; `path` is only used for error messages
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidConfigFile {
            path: path.to_path_buf(),
            message: e.message().to_owned(),
        })
    }

    /// Load and parse a config file, resolving relative paths against its directory
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            detail: format!("Failed to read {}: {e}", path.display()),
        })?;

        let config = Self::from_toml_str(&content, path)?;
        let base_dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        Ok(config.relative_to(base_dir))
    }

    /// Load the explicit file if given, else the default file if it exists
    pub fn locate(explicit: Option<&Path>) -> Result<Option<Self>, ConfigError> {
        match explicit {
            Some(path) => Self::load(path).map(Some),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    tracing::debug!("using config file {DEFAULT_CONFIG_FILE}");
                    Self::load(default).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn relative_to(mut self, base_dir: &Path) -> Self {
        let rebase = |path: PathBuf| {
            if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            }
        };

        self.catalog = self.catalog.map(rebase);
        for overrides in [self.baseline.as_mut(), self.candidate.as_mut()]
            .into_iter()
            .flatten()
        {
            overrides.root = overrides.root.take().map(rebase);
        }
        self
    }
}

impl EnvironmentOverrides {
    /// Apply every present override onto `settings`
    pub fn apply_to(self, settings: &mut EnvironmentSettings) {
        if let Some(root) = self.root {
            settings.root = root;
        }
        if let Some(entry_point) = self.entry_point {
            settings.entry_point = entry_point;
        }
        if let Some(args) = self.args {
            settings.args = args;
        }
        if let Some(artifact) = self.artifact {
            settings.artifact = artifact;
        }
        if let Some(input) = self.input {
            settings.input = Some(input);
        }
        if let Some(default_input) = self.default_input {
            settings.default_input = Some(default_input);
        }
        if let Some(package) = self.package {
            settings.package = package;
        }
        if let Some(create_command) = self.create_command {
            settings.create_command = create_command;
        }
        if let Some(install_command) = self.install_command {
            settings.install_command = install_command;
        }
    }
}
