//! Dual execution runner
//!
//! Executes each side of a benchmark `N` times inside its environment. Runs are
//! strictly sequential: one subprocess is spawned and awaited before the next
//! starts, within a side and across sides, so measured processes never compete
//! for CPU or I/O.
//!
//! Failures never abort the loop. Every attempt is recorded as a [`RunOutcome`]
//! and only the aggregation step decides what the side amounts to.

use crate::catalog::{BenchmarkDefinition, SideArtifact};
use crate::environment::{EnvironmentRegistry, ExecutionEnvironment, Side};
use crate::executor::{ExecOutput, ProcessExecutor};
use crate::results::{BenchmarkResult, ResultSet};
use crate::stats::{self, SideSummary};
use tracing::{debug, info, warn};

/// Number of trailing stderr lines kept as a run diagnostic
pub const DIAGNOSTIC_LINES: usize = 3;

/// Result of one subprocess execution
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Exit status was zero
    pub success: bool,
    /// Wall-clock seconds from spawn to exit
    pub elapsed_secs: f64,
    /// Trailing stderr lines; kept for failures and for the first run of a side
    pub diagnostic: Option<String>,
}

impl RunOutcome {
    /// A successful run
    pub fn succeeded(elapsed_secs: f64, diagnostic: Option<String>) -> Self {
        Self {
            success: true,
            elapsed_secs,
            diagnostic,
        }
    }

    /// A failed run
    pub fn failed(elapsed_secs: f64, diagnostic: Option<String>) -> Self {
        Self {
            success: false,
            elapsed_secs,
            diagnostic,
        }
    }
}

/// Last `count` non-blank lines of `text`, trimmed; `None` if there are none
pub fn tail_lines(text: &str, count: usize) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(count);
    let tail = &lines[start..];
    (!tail.is_empty()).then(|| tail.join("\n"))
}

/// Tracks whether a failure diagnostic may still be echoed for the current side
#[derive(Debug, Clone, Copy)]
struct FailureEcho {
    enabled: bool,
    echoed: bool,
}

impl FailureEcho {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            echoed: false,
        }
    }

    /// True exactly once per side, for the first failure, when enabled
    fn claim(&mut self) -> bool {
        let echo = self.enabled && !self.echoed;
        self.echoed |= echo;
        echo
    }
}

/// Drives both sides of each benchmark through a [`ProcessExecutor`]
pub struct DualRunner<'a, E: ProcessExecutor> {
    executor: &'a E,
    registry: &'a EnvironmentRegistry,
    verbose_on_first_failure: bool,
}

impl<'a, E: ProcessExecutor> DualRunner<'a, E> {
    /// Runner over `registry`'s environments; echoes the first failure by default
    pub fn new(executor: &'a E, registry: &'a EnvironmentRegistry) -> Self {
        Self {
            executor,
            registry,
            verbose_on_first_failure: true,
        }
    }

    /// Echo the first failing run's diagnostic of each side at warn level
    #[must_use]
    pub fn with_verbose_on_first_failure(mut self, verbose: bool) -> Self {
        self.verbose_on_first_failure = verbose;
        self
    }

    /// Current first-failure echo policy
    pub fn verbose_on_first_failure(&self) -> bool {
        self.verbose_on_first_failure
    }

    /// Run `artifact` `repeat_count` times inside `environment`
    pub fn run_side(
        &self,
        environment: &ExecutionEnvironment,
        artifact: &SideArtifact,
        repeat_count: u32,
    ) -> Vec<RunOutcome> {
        let side = environment.side();
        let invocation = environment.invocation(&artifact.path, artifact.input.as_deref());
        debug!("{side} command: {}", invocation.display_command());

        let mut echo = FailureEcho::new(self.verbose_on_first_failure);
        (1..=repeat_count)
            .map(|run| {
                let outcome = match self.executor.execute(&invocation) {
                    Ok(output) => Self::classify(&output, run == 1),
                    Err(e) => RunOutcome::failed(0.0, Some(e.to_string())),
                };
                Self::report(side, run, repeat_count, &outcome, &mut echo);
                outcome
            })
            .collect()
    }

    /// Run both sides of `definition` and aggregate them into a result
    pub fn run_benchmark(
        &self,
        definition: &BenchmarkDefinition,
        repeat_count: u32,
    ) -> BenchmarkResult {
        info!("{}", "=".repeat(60));
        info!("  {}: {}", definition.name, definition.description);
        info!("  {repeat_count} run(s) each");
        info!("{}", "=".repeat(60));

        let [baseline, candidate] = Side::ALL.map(|side| {
            stats::aggregate(&self.run_optional_side(definition, side, repeat_count))
        });

        let result = BenchmarkResult::new(
            &definition.name,
            &definition.description,
            repeat_count,
            baseline,
            candidate,
        );

        if let Some(speedup) = result.speedup() {
            let baseline_mean = result.baseline().and_then(SideSummary::mean);
            let candidate_mean = result.candidate().and_then(SideSummary::mean);
            if let Some((baseline_mean, candidate_mean)) = baseline_mean.zip(candidate_mean) {
                info!("  Baseline mean:  {baseline_mean:.3}s");
                info!("  Candidate mean: {candidate_mean:.3}s");
            }
            info!("  Speedup:        {speedup:.1}x");
        }
        result
    }

    /// Run every definition in order, appending each result
    pub fn run_all(
        &self,
        definitions: &[BenchmarkDefinition],
        repeat_count: u32,
        results: &mut ResultSet,
    ) {
        for definition in definitions {
            results.append(self.run_benchmark(definition, repeat_count));
        }
    }

    fn run_optional_side(
        &self,
        definition: &BenchmarkDefinition,
        side: Side,
        repeat_count: u32,
    ) -> Vec<RunOutcome> {
        match definition.artifact(side) {
            Some(artifact) => self.run_side(self.registry.get(side), artifact, repeat_count),
            None => {
                info!("  {side}: no artifact found, skipping");
                Vec::new()
            }
        }
    }

    fn classify(output: &ExecOutput, first_run: bool) -> RunOutcome {
        let elapsed_secs = output.elapsed.as_secs_f64();
        if output.success() {
            let diagnostic = first_run
                .then(|| tail_lines(&output.stderr, DIAGNOSTIC_LINES))
                .flatten();
            return RunOutcome::succeeded(elapsed_secs, diagnostic);
        }

        let diagnostic = if output.timed_out {
            Some(format!("timed out after {elapsed_secs:.3}s"))
        } else {
            tail_lines(&output.stderr, DIAGNOSTIC_LINES)
        };
        RunOutcome::failed(elapsed_secs, diagnostic)
    }

    fn report(side: Side, run: u32, total: u32, outcome: &RunOutcome, echo: &mut FailureEcho) {
        let status = if outcome.success { "ok" } else { "FAIL" };
        info!(
            "  {side:<9} run {run}/{total}: {:.3}s [{status}]",
            outcome.elapsed_secs
        );

        if outcome.success {
            return;
        }
        // The first failure consumes the echo even when it has nothing to show.
        let echoed = echo.claim();
        let Some(diagnostic) = outcome.diagnostic.as_deref() else {
            return;
        };
        if echoed {
            for line in diagnostic.lines() {
                warn!("             {line}");
            }
        } else {
            debug!("{side} run {run} diagnostic: {diagnostic}");
        }
    }
}
