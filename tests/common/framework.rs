//! Unified Test Framework
//!
//! A [`TestWorkspace`] is a temp directory laid out the way the harness expects
//! when run from it: `benchmarks/<name>/...`, `.venv-baseline/` and
//! `.venv-candidate/`, plus an optional `dual-bench.toml`.
//!
//! Fake environments use a `/bin/sh` wrapper as their entry point, so every
//! artifact is a shell script. The baseline wrapper receives the playbook path
//! followed by `-i <inventory> -c local`, which the scripts simply ignore.

use assert_cmd::Command as AssertCommand;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::TempDir;

/// Main result type for the framework
pub type Result<T = ()> = std::result::Result<T, Box<dyn Error>>;

/// Binary under test
#[allow(dead_code)]
pub const BINARY: &str = "dual-bench";

/// Entry point script standing in for an interpreter
pub const SHELL_WRAPPER: &str = "#!/bin/sh\nexec /bin/sh \"$@\"\n";

/// Log file appended to by [`BenchmarkFixture::counting`] artifacts
#[allow(dead_code)]
pub const RUN_LOG: &str = "runs.log";

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(unix)]
fn write_executable(path: &Path, content: &str) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    write_file(path, content)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// One benchmark directory in the catalog
#[derive(Debug, Clone)]
pub struct BenchmarkFixture {
    name: String,
    description: Option<String>,
    baseline: Option<String>,
    candidate: Option<String>,
    inventory: Option<String>,
}

impl BenchmarkFixture {
    /// Benchmark with metadata only
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Self {
            name: name.as_ref().to_string(),
            description: None,
            baseline: None,
            candidate: None,
            inventory: None,
        }
    }

    /// Both sides succeed and log one line per run to [`RUN_LOG`]
    #[allow(dead_code)]
    pub fn counting<S: AsRef<str>>(name: S) -> Self {
        let name = name.as_ref();
        Self::new(name)
            .baseline(format!("echo \"{name} baseline\" >> {RUN_LOG}\n"))
            .candidate(format!("echo \"{name} candidate\" >> {RUN_LOG}\n"))
    }

    /// Set the metadata description
    #[allow(dead_code)]
    pub fn description<S: AsRef<str>>(mut self, description: S) -> Self {
        self.description = Some(description.as_ref().to_string());
        self
    }

    /// Baseline artifact body (shell script)
    pub fn baseline<S: AsRef<str>>(mut self, script: S) -> Self {
        self.baseline = Some(script.as_ref().to_string());
        self
    }

    /// Candidate artifact body (shell script)
    pub fn candidate<S: AsRef<str>>(mut self, script: S) -> Self {
        self.candidate = Some(script.as_ref().to_string());
        self
    }

    /// Baseline sibling input file
    #[allow(dead_code)]
    pub fn inventory<S: AsRef<str>>(mut self, content: S) -> Self {
        self.inventory = Some(content.as_ref().to_string());
        self
    }

    fn write(&self, catalog: &Path) -> Result<()> {
        let dir = catalog.join(&self.name);
        let metadata = match &self.description {
            Some(description) => format!("description = {description:?}\n"),
            None => String::new(),
        };
        write_file(&dir.join("bench.toml"), &metadata)?;

        if let Some(script) = &self.baseline {
            write_file(&dir.join("playbook.yml"), script)?;
        }
        if let Some(script) = &self.candidate {
            write_file(&dir.join("script.py"), script)?;
        }
        if let Some(content) = &self.inventory {
            write_file(&dir.join("inventory"), content)?;
        }
        Ok(())
    }
}

/// Temporary workspace the binary runs in
#[derive(Debug)]
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Create a new workspace builder
    pub fn builder() -> TestWorkspaceBuilder {
        TestWorkspaceBuilder::new()
    }

    /// Get the path to the workspace
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a file inside the workspace
    pub fn file<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.path().join(relative)
    }

    /// Contents of a workspace file, empty if it does not exist
    #[allow(dead_code)]
    pub fn read<P: AsRef<Path>>(&self, relative: P) -> String {
        fs::read_to_string(self.file(relative)).unwrap_or_default()
    }

    /// Command running the binary inside this workspace
    #[allow(dead_code)]
    pub fn command(&self) -> TestCommand {
        TestCommand::new().in_dir(self.path())
    }
}

/// Workspace builder
#[derive(Debug, Default)]
pub struct TestWorkspaceBuilder {
    benchmarks: Vec<BenchmarkFixture>,
    environments: Vec<(&'static str, &'static str)>,
    config: Option<String>,
    files: Vec<(String, String)>,
}

impl TestWorkspaceBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a benchmark to the default catalog
    pub fn with_benchmark(mut self, benchmark: BenchmarkFixture) -> Self {
        self.benchmarks.push(benchmark);
        self
    }

    /// Create both fake environments at their default roots
    #[allow(dead_code)]
    pub fn with_environments(self) -> Self {
        self.with_baseline_environment().with_candidate_environment()
    }

    /// Create only the baseline environment
    #[allow(dead_code)]
    pub fn with_baseline_environment(mut self) -> Self {
        self.environments
            .push((".venv-baseline", "bin/ansible-playbook"));
        self
    }

    /// Create only the candidate environment
    #[allow(dead_code)]
    pub fn with_candidate_environment(mut self) -> Self {
        self.environments.push((".venv-candidate", "bin/python"));
        self
    }

    /// Write `dual-bench.toml` with this content
    #[allow(dead_code)]
    pub fn with_config<S: AsRef<str>>(mut self, content: S) -> Self {
        self.config = Some(content.as_ref().to_string());
        self
    }

    /// Add an arbitrary file
    #[allow(dead_code)]
    pub fn with_file<P: AsRef<str>, S: AsRef<str>>(mut self, path: P, content: S) -> Self {
        self.files
            .push((path.as_ref().to_string(), content.as_ref().to_string()));
        self
    }

    /// Build the workspace
    #[cfg(unix)]
    pub fn build(self) -> Result<TestWorkspace> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let catalog = root.join("benchmarks");
        for benchmark in &self.benchmarks {
            benchmark.write(&catalog)?;
        }

        for (env_root, entry_point) in &self.environments {
            write_executable(&root.join(env_root).join(entry_point), SHELL_WRAPPER)?;
        }

        if let Some(config) = &self.config {
            write_file(&root.join("dual-bench.toml"), config)?;
        }

        for (path, content) in &self.files {
            write_file(&root.join(path), content)?;
        }

        Ok(TestWorkspace { temp_dir })
    }
}

/// Test command
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct TestCommand {
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl TestCommand {
    /// Create a new command
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Set working directory
    #[allow(dead_code)]
    pub fn in_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add argument
    #[allow(dead_code)]
    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add several arguments
    #[allow(dead_code)]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_string()));
        self
    }

    /// Set the repeat count
    #[allow(dead_code)]
    pub fn runs(self, runs: u32) -> Self {
        self.arg("--runs").arg(runs.to_string())
    }

    /// Build the assert_cmd command without running it
    #[allow(dead_code)]
    pub fn to_command(&self) -> Result<AssertCommand> {
        let mut cmd = AssertCommand::cargo_bin(BINARY)?;
        cmd.env_remove("RUST_LOG");
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.args(&self.args);
        Ok(cmd)
    }

    /// Execute the command
    #[allow(dead_code)]
    pub fn execute(self) -> Result<CommandOutput> {
        let output = self.to_command()?.output()?;
        Ok(CommandOutput::from_output(output))
    }
}

impl Default for TestCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Command output
#[allow(dead_code)]
#[derive(Debug)]
pub struct CommandOutput {
    output: Output,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        Self {
            output,
            stdout,
            stderr,
        }
    }

    /// Check if command was successful
    #[allow(dead_code)]
    pub fn is_success(&self) -> bool {
        self.output.status.success()
    }

    /// Get stdout
    #[allow(dead_code)]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Get stderr
    #[allow(dead_code)]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Get exit code
    #[allow(dead_code)]
    pub fn exit_code(&self) -> Option<i32> {
        self.output.status.code()
    }

    /// Summary row for `name`, if printed
    #[allow(dead_code)]
    pub fn summary_row(&self, name: &str) -> Option<&str> {
        self.stdout
            .lines()
            .find(|line| line.split_whitespace().next() == Some(name))
    }
}
