//! Environment provisioning
//!
//! One-time setup that makes both environments ready: create the environment
//! root if it is absent, then install the side's package into it. This never
//! runs inside the measurement loop; it either completes or fails fatally.

use super::{ExecutionEnvironment, Side};
use crate::error::{Error, Result};
use crate::executor::{Invocation, ProcessExecutor};
use tracing::info;

/// Placeholder replaced by the environment root in provisioning commands
pub const ROOT_PLACEHOLDER: &str = "{root}";

/// Placeholder replaced by the package name in provisioning commands
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

/// What it takes to provision one side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    environment: ExecutionEnvironment,
    package: String,
    create_command: Vec<String>,
    install_command: Vec<String>,
}

impl ProvisionPlan {
    /// Plan for `environment` installing `package`, with no commands yet
    pub fn new(environment: ExecutionEnvironment, package: impl Into<String>) -> Self {
        Self {
            environment,
            package: package.into(),
            create_command: Vec::new(),
            install_command: Vec::new(),
        }
    }

    /// Command template that creates the environment root
    #[must_use]
    pub fn with_create_command(mut self, command: Vec<String>) -> Self {
        self.create_command = command;
        self
    }

    /// Command template that installs the package
    #[must_use]
    pub fn with_install_command(mut self, command: Vec<String>) -> Self {
        self.install_command = command;
        self
    }

    /// Side this plan provisions
    pub fn side(&self) -> Side {
        self.environment.side()
    }

    /// Environment this plan provisions
    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    fn expand(&self, template: &[String]) -> Option<Invocation> {
        let root = self.environment.root().to_string_lossy();
        let mut tokens = template.iter().map(|token| {
            token
                .replace(ROOT_PLACEHOLDER, &root)
                .replace(PACKAGE_PLACEHOLDER, &self.package)
        });
        let program = tokens.next()?;
        Some(Invocation::new(program).args(tokens))
    }
}

/// Runs provisioning plans through a [`ProcessExecutor`]
pub struct Provisioner<'a, E: ProcessExecutor> {
    executor: &'a E,
}

impl<'a, E: ProcessExecutor> Provisioner<'a, E> {
    /// Create a provisioner using `executor` for every command
    pub fn new(executor: &'a E) -> Self {
        Self { executor }
    }

    /// Provision every plan in order; idempotent for already-created roots
    pub fn ensure_provisioned(&self, plans: &[ProvisionPlan]) -> Result<()> {
        plans.iter().try_for_each(|plan| self.provision(plan))
    }

    fn provision(&self, plan: &ProvisionPlan) -> Result<()> {
        let side = plan.side();
        let root = plan.environment().root();

        if root.exists() {
            info!("{side} environment exists at {}", root.display());
        } else {
            info!("Creating {side} environment at {}...", root.display());
            self.run_step(plan, "create", &plan.create_command)?;
        }

        info!("Installing {} into {side} environment...", plan.package);
        self.run_step(plan, "install", &plan.install_command)?;

        if !plan.environment().check_ready() {
            return Err(Error::provisioning_error(format!(
                "{side} entry point {} still missing after setup",
                plan.environment().entry_point_path().display()
            )));
        }
        Ok(())
    }

    fn run_step(&self, plan: &ProvisionPlan, step: &str, template: &[String]) -> Result<()> {
        let side = plan.side();
        let invocation = plan.expand(template).ok_or_else(|| {
            Error::provisioning_error(format!("{side} {step} command is empty"))
        })?;

        let output = self.executor.execute(&invocation).map_err(|e| {
            Error::provisioning_error(format!("{side} {step} step: {e}"))
        })?;

        if output.success() {
            return Ok(());
        }

        let detail = crate::runner::tail_lines(&output.stderr, crate::runner::DIAGNOSTIC_LINES)
            .unwrap_or_else(|| "no error output".to_owned());
        Err(Error::provisioning_error(format!(
            "{side} {step} step '{}' exited with {:?}: {detail}",
            invocation.display_command(),
            output.exit_code
        )))
    }
}
