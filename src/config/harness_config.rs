//! Harness configuration module
//!
//! This module provides the immutable [`HarnessConfig`] every component is built
//! from, combining CLI arguments, the optional config file and defaults.

use super::{ConfigError, FileConfig};
use crate::catalog::{Catalog, SideLayout};
use crate::environment::{EnvironmentRegistry, ExecutionEnvironment, ProvisionPlan, Side};
use std::path::PathBuf;
use std::time::Duration;

/// Runs per side when nothing else is configured
pub const DEFAULT_RUNS: u32 = 3;

/// Catalog root when nothing else is configured
pub const DEFAULT_CATALOG: &str = "benchmarks";

/// CLI arguments structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Catalog root override
    pub catalog: Option<PathBuf>,
    /// Baseline environment root override
    pub baseline_env: Option<PathBuf>,
    /// Candidate environment root override
    pub candidate_env: Option<PathBuf>,
    /// Runs per side override
    pub runs: Option<u32>,
    /// Per-run timeout in seconds
    pub timeout_secs: Option<f64>,
    /// Suppress the first-failure diagnostic echo
    pub quiet_failures: bool,
}

/// Everything needed to locate, launch and provision one side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSettings {
    /// Environment root directory
    pub root: PathBuf,
    /// Interpreter/binary path relative to `root`
    pub entry_point: PathBuf,
    /// Launch-argument template (`{artifact}`, `{input}`)
    pub args: Vec<String>,
    /// Artifact file name inside each benchmark directory
    pub artifact: String,
    /// Optional input file name inside each benchmark directory
    pub input: Option<String>,
    /// Input value used when the input file is absent
    pub default_input: Option<String>,
    /// Package installed by the setup command
    pub package: String,
    /// Command template creating the environment (`{root}`)
    pub create_command: Vec<String>,
    /// Command template installing the package (`{root}`, `{package}`)
    pub install_command: Vec<String>,
}

impl EnvironmentSettings {
    /// Baseline defaults: an ansible-playbook virtualenv run against local inventory
    pub fn baseline_defaults() -> Self {
        Self {
            root: PathBuf::from(".venv-baseline"),
            entry_point: PathBuf::from("bin/ansible-playbook"),
            args: to_strings(&["{artifact}", "-i", "{input}", "-c", "local"]),
            artifact: "playbook.yml".to_owned(),
            input: Some("inventory".to_owned()),
            default_input: Some("localhost,".to_owned()),
            package: "ansible-core".to_owned(),
            create_command: default_create_command(),
            install_command: default_install_command(),
        }
    }

    /// Candidate defaults: a Python virtualenv running a script
    pub fn candidate_defaults() -> Self {
        Self {
            root: PathBuf::from(".venv-candidate"),
            entry_point: PathBuf::from("bin/python"),
            args: to_strings(&["{artifact}"]),
            artifact: "script.py".to_owned(),
            input: None,
            default_input: None,
            package: "ftl2".to_owned(),
            create_command: default_create_command(),
            install_command: default_install_command(),
        }
    }

    fn environment(&self, side: Side) -> ExecutionEnvironment {
        ExecutionEnvironment::new(side, &self.root, &self.entry_point).with_args(self.args.clone())
    }

    fn layout(&self) -> SideLayout {
        let layout = SideLayout::new(&self.artifact);
        let layout = match &self.input {
            Some(input) => layout.with_input(input),
            None => layout,
        };
        match &self.default_input {
            Some(default_input) => layout.with_default_input(default_input),
            None => layout,
        }
    }

    fn validate(&self, side: Side) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: &str, expected: &str| ConfigError::InvalidConfigValue {
            key: format!("{side}.{key}"),
            value: value.to_owned(),
            expected: expected.to_owned(),
        };

        if self.entry_point.as_os_str().is_empty() {
            return Err(invalid("entry_point", "", "a path relative to the environment root"));
        }
        if self.artifact.trim().is_empty() || self.artifact.contains('/') {
            return Err(invalid("artifact", &self.artifact, "a file name"));
        }
        if self.args.is_empty() {
            return Err(invalid("args", "[]", "a non-empty argument template"));
        }
        if self.create_command.is_empty() || self.install_command.is_empty() {
            return Err(invalid("create_command/install_command", "[]", "a non-empty command"));
        }
        Ok(())
    }
}

fn to_strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|token| (*token).to_owned()).collect()
}

fn default_create_command() -> Vec<String> {
    to_strings(&["python3", "-m", "venv", "{root}"])
}

fn default_install_command() -> Vec<String> {
    to_strings(&["{root}/bin/python", "-m", "pip", "install", "-q", "{package}"])
}

/// Main harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    catalog_root: PathBuf,
    runs: u32,
    timeout: Option<Duration>,
    verbose_on_first_failure: bool,
    baseline: EnvironmentSettings,
    candidate: EnvironmentSettings,
    registry: EnvironmentRegistry,
}

/// Configuration builder for layered composition
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    catalog_root: Option<PathBuf>,
    runs: Option<u32>,
    timeout: Option<Duration>,
    verbose_on_first_failure: Option<bool>,
    baseline: EnvironmentSettings,
    candidate: EnvironmentSettings,
}

impl ConfigBuilder {
    /// Create a builder holding the built-in defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog_root: None,
            runs: None,
            timeout: None,
            verbose_on_first_failure: None,
            baseline: EnvironmentSettings::baseline_defaults(),
            candidate: EnvironmentSettings::candidate_defaults(),
        }
    }

    /// Set the catalog root
    #[must_use]
    pub fn with_catalog_root(mut self, root: PathBuf) -> Self {
        self.catalog_root = Some(root);
        self
    }

    /// Set runs per side
    #[must_use]
    pub const fn with_runs(mut self, runs: u32) -> Self {
        self.runs = Some(runs);
        self
    }

    /// Set the per-run timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the first-failure echo policy
    #[must_use]
    pub const fn with_verbose_on_first_failure(mut self, verbose: bool) -> Self {
        self.verbose_on_first_failure = Some(verbose);
        self
    }

    /// Replace one side's settings
    #[must_use]
    pub fn with_environment(mut self, side: Side, settings: EnvironmentSettings) -> Self {
        *self.settings_mut(side) = settings;
        self
    }

    /// Layer a parsed config file over the current values
    pub fn apply_file(mut self, file: FileConfig) -> Result<Self, ConfigError> {
        if let Some(catalog) = file.catalog {
            self.catalog_root = Some(catalog);
        }
        if let Some(runs) = file.runs {
            self.runs = Some(validate_runs(runs).map_err(|expected| {
                ConfigError::InvalidConfigValue {
                    key: "runs".to_owned(),
                    value: runs.to_string(),
                    expected,
                }
            })?);
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Some(parse_timeout(secs).map_err(|expected| {
                ConfigError::InvalidConfigValue {
                    key: "timeout_secs".to_owned(),
                    value: secs.to_string(),
                    expected,
                }
            })?);
        }
        if let Some(verbose) = file.verbose_on_first_failure {
            self.verbose_on_first_failure = Some(verbose);
        }
        if let Some(overrides) = file.baseline {
            overrides.apply_to(&mut self.baseline);
        }
        if let Some(overrides) = file.candidate {
            overrides.apply_to(&mut self.candidate);
        }
        Ok(self)
    }

    /// Layer CLI arguments over the current values
    pub fn apply_cli(mut self, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        if let Some(catalog) = &cli_args.catalog {
            self.catalog_root = Some(catalog.clone());
        }
        if let Some(root) = &cli_args.baseline_env {
            self.baseline.root = root.clone();
        }
        if let Some(root) = &cli_args.candidate_env {
            self.candidate.root = root.clone();
        }
        if let Some(runs) = cli_args.runs {
            self.runs = Some(validate_runs(runs).map_err(|expected| {
                ConfigError::InvalidCliArgument {
                    argument: "--runs".to_owned(),
                    value: runs.to_string(),
                    expected,
                }
            })?);
        }
        if let Some(secs) = cli_args.timeout_secs {
            self.timeout = Some(parse_timeout(secs).map_err(|expected| {
                ConfigError::InvalidCliArgument {
                    argument: "--timeout".to_owned(),
                    value: secs.to_string(),
                    expected,
                }
            })?);
        }
        if cli_args.quiet_failures {
            self.verbose_on_first_failure = Some(false);
        }
        Ok(self)
    }

    /// Validate and build the final HarnessConfig
    pub fn build(self) -> Result<HarnessConfig, ConfigError> {
        self.baseline.validate(Side::Baseline)?;
        self.candidate.validate(Side::Candidate)?;
        let registry = EnvironmentRegistry::new(
            self.baseline.environment(Side::Baseline),
            self.candidate.environment(Side::Candidate),
        )?;

        Ok(HarnessConfig {
            catalog_root: self
                .catalog_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG)),
            runs: self.runs.unwrap_or(DEFAULT_RUNS),
            timeout: self.timeout,
            verbose_on_first_failure: self.verbose_on_first_failure.unwrap_or(true),
            baseline: self.baseline,
            candidate: self.candidate,
            registry,
        })
    }

    fn settings_mut(&mut self, side: Side) -> &mut EnvironmentSettings {
        match side {
            Side::Baseline => &mut self.baseline,
            Side::Candidate => &mut self.candidate,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_runs(runs: u32) -> Result<u32, String> {
    (runs >= 1)
        .then_some(runs)
        .ok_or_else(|| "a positive integer".to_owned())
}

fn parse_timeout(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|timeout| !timeout.is_zero())
        .ok_or_else(|| "a positive number of seconds".to_owned())
}

impl HarnessConfig {
    /// Create HarnessConfig from CLI arguments
    ///
    /// Priority order:
    /// 1. CLI parameters (highest priority)
    /// 2. Config file values (`--config` or `dual-bench.toml`)
    /// 3. Built-in defaults
    pub fn from_cli(cli_args: CliArgs) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::new();
        let builder = match FileConfig::locate(cli_args.config.as_deref())? {
            Some(file) => builder.apply_file(file)?,
            None => builder,
        };
        builder.apply_cli(&cli_args)?.build()
    }

    /// Catalog rooted at the configured directory with each side's layout
    pub fn catalog(&self) -> Catalog {
        Catalog::new(&self.catalog_root)
            .with_layout(Side::Baseline, self.baseline.layout())
            .with_layout(Side::Candidate, self.candidate.layout())
    }

    /// Registry of both configured environments
    pub fn registry(&self) -> EnvironmentRegistry {
        self.registry.clone()
    }

    /// Provisioning plans, baseline first
    pub fn provision_plans(&self) -> Vec<ProvisionPlan> {
        Side::ALL
            .into_iter()
            .map(|side| {
                let settings = self.settings(side);
                ProvisionPlan::new(settings.environment(side), &settings.package)
                    .with_create_command(settings.create_command.clone())
                    .with_install_command(settings.install_command.clone())
            })
            .collect()
    }

    /// Catalog root directory
    pub fn catalog_root(&self) -> &std::path::Path {
        &self.catalog_root
    }

    /// Runs per side
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Per-run timeout, `None` waits forever
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the first failing run's diagnostic is echoed
    pub fn verbose_on_first_failure(&self) -> bool {
        self.verbose_on_first_failure
    }

    /// Settings for `side`
    pub fn settings(&self, side: Side) -> &EnvironmentSettings {
        match side {
            Side::Baseline => &self.baseline,
            Side::Candidate => &self.candidate,
        }
    }
}
