//! CLI entry point for dual-bench
//!
//! Compares the wall-clock performance of a baseline and a candidate tool,
//! each installed in its own environment, across a catalog of benchmarks.

use anyhow::Context;
use clap::{ArgAction, Parser};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use dual_bench::config::CliArgs;
use dual_bench::environment::Provisioner;
use dual_bench::{
    reporter, ConfigError, DualRunner, Error, HarnessConfig, ResultSet, SystemProcessExecutor,
};

/// Side-by-side benchmarks of two tools living in isolated environments
#[derive(Parser)]
#[command(name = "dual-bench")]
#[command(version, about, long_about = None)]
struct Args {
    /// Benchmark names to run (default: all)
    #[arg(value_name = "NAMES")]
    benchmarks: Vec<String>,

    /// Number of runs per side (default: 3)
    #[arg(long, value_name = "N")]
    runs: Option<u32>,

    /// List available benchmarks
    #[arg(long, action = ArgAction::SetTrue)]
    list: bool,

    /// Write results to a JSON file
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Write a Markdown report
    #[arg(long, value_name = "FILE")]
    markdown: Option<PathBuf>,

    /// Create both environments and install their packages
    #[arg(long, action = ArgAction::SetTrue)]
    setup: bool,

    /// Benchmark catalog directory
    #[arg(long, value_name = "DIR")]
    catalog: Option<PathBuf>,

    /// Baseline environment root
    #[arg(long, value_name = "DIR")]
    baseline_env: Option<PathBuf>,

    /// Candidate environment root
    #[arg(long, value_name = "DIR")]
    candidate_env: Option<PathBuf>,

    /// Kill a run after this many seconds and record it as failed
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Config file (default: dual-bench.toml in the current directory, if present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not echo the first failing run's stderr
    #[arg(long, action = ArgAction::SetTrue)]
    quiet_failures: bool,

    /// More log output (-v debug)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only warnings and errors on stderr
    #[arg(short, long, action = ArgAction::SetTrue)]
    quiet: bool,
}

/// Convert CLI args to CliArgs struct for HarnessConfig
impl From<&Args> for CliArgs {
    fn from(args: &Args) -> Self {
        Self {
            config: args.config.clone(),
            catalog: args.catalog.clone(),
            baseline_env: args.baseline_env.clone(),
            candidate_env: args.candidate_env.clone(),
            runs: args.runs,
            timeout_secs: args.timeout,
            quiet_failures: args.quiet_failures,
        }
    }
}

fn default_log_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, _) => "debug",
    }
}

/// Logs go to stderr so stdout carries only the summary
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init();
}

/// Handle configuration errors with the remediation hint and exit
fn handle_config_error(error: ConfigError) -> ! {
    eprintln!("{error}");
    process::exit(1);
}

/// Report an unknown benchmark name together with the valid ones and exit
fn handle_not_found(name: &str, available: &[String]) -> ! {
    eprintln!("Unknown benchmark: {name}");
    if available.is_empty() {
        eprintln!("No benchmarks are available.");
    } else {
        eprintln!("Available benchmarks: {}", available.join(", "));
    }
    process::exit(1);
}

/// Route operator errors to their handlers; everything else propagates
fn escalate(error: Error) -> anyhow::Error {
    match error {
        Error::Config(error) => handle_config_error(error),
        Error::NotFound { name, available } => handle_not_found(&name, &available),
        other => anyhow::Error::new(other),
    }
}

fn list_benchmarks(config: &HarnessConfig) -> anyhow::Result<()> {
    let catalog = config.catalog();
    let names = catalog.discover().map_err(escalate)?;

    println!("Available benchmarks:");
    for name in &names {
        let description = catalog.describe(name).map_err(escalate)?;
        println!("  {name:<30} {description}");
    }
    Ok(())
}

fn setup(config: &HarnessConfig) -> anyhow::Result<()> {
    let executor = SystemProcessExecutor::new();
    Provisioner::new(&executor)
        .ensure_provisioned(&config.provision_plans())
        .map_err(escalate)?;
    println!("Setup complete.");
    Ok(())
}

fn run(args: &Args, config: &HarnessConfig) -> anyhow::Result<()> {
    let registry = config.registry();
    registry.require_ready().unwrap_or_else(|e| handle_config_error(e));

    let catalog = config.catalog();
    let definitions = catalog.resolve_all(&args.benchmarks).map_err(escalate)?;
    if definitions.is_empty() {
        println!(
            "No benchmarks found. Create one in {}/<name>/{}",
            catalog.root().display(),
            dual_bench::catalog::METADATA_FILE
        );
        return Ok(());
    }

    let executor = SystemProcessExecutor::new().with_timeout(config.timeout());
    let runner = DualRunner::new(&executor, &registry)
        .with_verbose_on_first_failure(config.verbose_on_first_failure());

    let mut results = ResultSet::new();
    runner.run_all(&definitions, config.runs(), &mut results);

    println!();
    println!("{}", "=".repeat(60));
    println!("  SUMMARY");
    println!("{}", "=".repeat(60));
    print!("{}", reporter::render_table(&results));

    if let Some(path) = &args.json {
        results
            .write_json(path)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        println!();
        println!("Results written to {}", path.display());
    }

    if let Some(path) = &args.markdown {
        results
            .write_markdown(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    let config = HarnessConfig::from_cli(CliArgs::from(&args))
        .unwrap_or_else(|error| handle_config_error(error));

    if args.setup {
        return setup(&config);
    }
    if args.list {
        return list_benchmarks(&config);
    }
    run(&args, &config)
}
