//! Process execution module
//!
//! This module provides the single process boundary the harness needs: run a
//! program with arguments, wait for it, and report exit status, captured output
//! and wall-clock time. Everything that spawns a process (benchmark runs and
//! environment provisioning) goes through [`ProcessExecutor`].

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// First poll delay while a timeout is armed; doubles up to [`MAX_POLL_INTERVAL`]
const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on the poll delay while a timeout is armed
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for pipe readers after a timed-out child was killed
const KILL_GRACE: Duration = Duration::from_millis(100);

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program to execute
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the program
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Human-readable command line, used in logs and error messages
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        command
    }
}

/// Everything observed about one finished (or killed) process
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutput {
    /// Exit code, `None` when the process was killed by a signal or timed out
    pub exit_code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
    /// Whether the process was killed because it exceeded the timeout
    pub timed_out: bool,
}

impl ExecOutput {
    /// Output of a process that exited on its own
    pub fn completed(exit_code: i32, stderr: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
            elapsed,
            timed_out: false,
        }
    }

    /// Zero exit status and not timed out
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Errors raised at the process boundary
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecError {
    /// The program could not be started
    #[error("failed to spawn '{command}': {error}")]
    SpawnFailed { command: String, error: String },
    /// The program started but waiting on it failed
    #[error("failed to wait for '{command}': {error}")]
    WaitFailed { command: String, error: String },
}

/// Trait for executing a subprocess to completion
pub trait ProcessExecutor {
    /// Run `invocation`, block until it exits, and report what happened
    fn execute(&self, invocation: &Invocation) -> Result<ExecOutput, ExecError>;
}

/// Executor that spawns real operating-system processes
#[derive(Debug, Clone, Default)]
pub struct SystemProcessExecutor {
    timeout: Option<Duration>,
}

impl SystemProcessExecutor {
    /// Executor without a timeout: a process that hangs blocks forever
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill processes that run longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn run_to_completion(invocation: &Invocation) -> Result<ExecOutput, ExecError> {
        let start = Instant::now();
        let output = invocation
            .command()
            .output()
            .map_err(|e| ExecError::SpawnFailed {
                command: invocation.display_command(),
                error: e.to_string(),
            })?;
        let elapsed = start.elapsed();

        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed,
            timed_out: false,
        })
    }

    fn run_with_timeout(
        invocation: &Invocation,
        timeout: Duration,
    ) -> Result<ExecOutput, ExecError> {
        let wait_error = |e: std::io::Error| ExecError::WaitFailed {
            command: invocation.display_command(),
            error: e.to_string(),
        };

        let start = Instant::now();
        let mut child = invocation
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::SpawnFailed {
                command: invocation.display_command(),
                error: e.to_string(),
            })?;

        // Pipes are drained concurrently so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(Self::drain);
        let stderr = child.stderr.take().map(Self::drain);

        let mut interval = INITIAL_POLL_INTERVAL;
        let (status, timed_out) = loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                break (status, false);
            }
            let waited = start.elapsed();
            if waited >= timeout {
                // The child may exit between try_wait and kill; wait() settles either way.
                let _ = child.kill();
                break (child.wait().map_err(wait_error)?, true);
            }
            thread::sleep(interval.min(timeout - waited));
            interval = next_poll_interval(interval);
        };
        let elapsed = start.elapsed();

        // A killed child can leave grandchildren holding the pipes open.
        let grace = timed_out.then_some(KILL_GRACE);

        Ok(ExecOutput {
            exit_code: if timed_out { None } else { status.code() },
            stdout: Self::collect(stdout, grace),
            stderr: Self::collect(stderr, grace),
            elapsed,
            timed_out,
        })
    }

    fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            let _ = sender.send(buffer);
        });
        receiver
    }

    fn collect(receiver: Option<Receiver<Vec<u8>>>, grace: Option<Duration>) -> String {
        receiver
            .and_then(|receiver| match grace {
                Some(grace) => receiver.recv_timeout(grace).ok(),
                None => receiver.recv().ok(),
            })
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

/// Exponential backoff: short runs keep fine resolution, long ones poll rarely
fn next_poll_interval(current: Duration) -> Duration {
    (current * 2).min(MAX_POLL_INTERVAL)
}

impl ProcessExecutor for SystemProcessExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecOutput, ExecError> {
        match self.timeout {
            Some(timeout) => Self::run_with_timeout(invocation, timeout),
            None => Self::run_to_completion(invocation),
        }
    }
}

/// Mock executor for testing: replays scripted responses in order
#[cfg(test)]
pub struct MockProcessExecutor {
    responses: std::cell::RefCell<std::collections::VecDeque<Result<ExecOutput, ExecError>>>,
    calls: std::cell::RefCell<Vec<Invocation>>,
}

#[cfg(test)]
impl Default for MockProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MockProcessExecutor {
    /// Create a mock with no scripted responses
    pub fn new() -> Self {
        Self {
            responses: std::cell::RefCell::new(std::collections::VecDeque::new()),
            calls: std::cell::RefCell::new(Vec::new()),
        }
    }

    /// Queue a successful run taking `secs`
    pub fn with_success(self, secs: f64) -> Self {
        self.with_response(Ok(ExecOutput::completed(0, "", Duration::from_secs_f64(secs))))
    }

    /// Queue a failed run taking `secs`
    pub fn with_failure(self, secs: f64, exit_code: i32, stderr: &str) -> Self {
        self.with_response(Ok(ExecOutput::completed(
            exit_code,
            stderr,
            Duration::from_secs_f64(secs),
        )))
    }

    /// Queue a spawn error
    pub fn with_spawn_error(self, error: &str) -> Self {
        self.with_response(Err(ExecError::SpawnFailed {
            command: "mock".to_owned(),
            error: error.to_owned(),
        }))
    }

    /// Queue an arbitrary response
    pub fn with_response(self, response: Result<ExecOutput, ExecError>) -> Self {
        self.responses.borrow_mut().push_back(response);
        self
    }

    /// Invocations received so far, in order
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }
}

#[cfg(test)]
impl ProcessExecutor for MockProcessExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecOutput, ExecError> {
        self.calls.borrow_mut().push(invocation.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ExecError::SpawnFailed {
                    command: invocation.display_command(),
                    error: "no scripted response".to_owned(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **What is tested:** Poll delay backoff while a timeout is armed
    /// **Why it is tested:** A hot wake-up loop would contend with the measured process
    /// **Test conditions:** Repeatedly advances the delay from its initial value
    /// **Expectations:** Doubles from 1ms and settles at the cap
    #[test]
    fn test_poll_interval_backoff() {
        let mut interval = INITIAL_POLL_INTERVAL;
        let mut seen = vec![interval];
        for _ in 0..10 {
            interval = next_poll_interval(interval);
            seen.push(interval);
        }

        assert_eq!(seen[1], Duration::from_millis(2));
        assert_eq!(seen[5], Duration::from_millis(32));
        assert_eq!(seen[6], MAX_POLL_INTERVAL);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().expect("non-empty"), MAX_POLL_INTERVAL);
    }

    /// **What is tested:** Invocation builder and command-line rendering
    /// **Why it is tested:** The rendered command appears in logs and spawn errors
    /// **Test conditions:** Builds an invocation with single and batched arguments
    /// **Expectations:** Arguments keep their order and render space-separated
    #[test]
    fn test_invocation_display_command() {
        let invocation = Invocation::new("/env/bin/python")
            .arg("bench.py")
            .args(["-i", "localhost,"]);

        assert_eq!(invocation.program(), Path::new("/env/bin/python"));
        assert_eq!(invocation.arguments().len(), 3);
        assert_eq!(
            invocation.display_command(),
            "/env/bin/python bench.py -i localhost,"
        );
    }

    /// **What is tested:** Success classification of ExecOutput
    /// **Why it is tested:** Exit status zero is the only success criterion, and a timeout always fails
    #[test]
    fn test_exec_output_success() {
        assert!(ExecOutput::completed(0, "", Duration::ZERO).success());
        assert!(!ExecOutput::completed(2, "boom", Duration::ZERO).success());

        let mut killed = ExecOutput::completed(0, "", Duration::ZERO);
        killed.timed_out = true;
        assert!(!killed.success());
    }

    /// **What is tested:** MockProcessExecutor replays responses in order and records calls
    /// **Why it is tested:** Runner tests depend on deterministic scripted outcomes
    /// **Test conditions:** Two scripted responses, three calls
    /// **Expectations:** Responses come back in order, the exhausted mock reports a spawn failure
    #[test]
    fn test_mock_executor_replays_in_order() {
        let mock = MockProcessExecutor::new()
            .with_success(0.25)
            .with_failure(0.5, 1, "bad");
        let invocation = Invocation::new("prog");

        let first = mock.execute(&invocation).expect("scripted success");
        assert!(first.success());
        assert_eq!(first.elapsed, Duration::from_secs_f64(0.25));

        let second = mock.execute(&invocation).expect("scripted failure");
        assert_eq!(second.exit_code, Some(1));
        assert_eq!(second.stderr, "bad");

        assert!(matches!(
            mock.execute(&invocation),
            Err(ExecError::SpawnFailed { .. })
        ));
        assert_eq!(mock.calls().len(), 3);
    }

    /// **What is tested:** Spawning a program that does not exist
    /// **Why it is tested:** Missing interpreters must surface as ExecError, not a panic
    /// **Test conditions:** Executes a nonexistent absolute path, with and without a timeout
    /// **Expectations:** SpawnFailed carrying the command line
    #[test]
    fn test_system_executor_spawn_failure() {
        let invocation = Invocation::new("/nonexistent/dual-bench/program").arg("x");

        for executor in [
            SystemProcessExecutor::new(),
            SystemProcessExecutor::new().with_timeout(Some(Duration::from_secs(5))),
        ] {
            match executor.execute(&invocation) {
                Err(ExecError::SpawnFailed { command, .. }) => {
                    assert!(command.contains("/nonexistent/dual-bench/program"));
                }
                other => panic!("expected spawn failure, got {other:?}"),
            }
        }
    }

    /// **What is tested:** Exit code and stderr capture from a real process
    /// **Why it is tested:** The runner classifies success and extracts diagnostics from these fields
    /// **Test conditions:** Runs `sh -c` printing to stderr and exiting 3, both executor modes
    /// **Expectations:** Exit code 3, stderr captured, elapsed time recorded
    #[cfg(unix)]
    #[test]
    fn test_system_executor_captures_exit_and_stderr() {
        let invocation = Invocation::new("sh").args(["-c", "echo out; echo oops >&2; exit 3"]);

        for executor in [
            SystemProcessExecutor::new(),
            SystemProcessExecutor::new().with_timeout(Some(Duration::from_secs(30))),
        ] {
            let output = executor.execute(&invocation).expect("sh should spawn");
            assert_eq!(output.exit_code, Some(3));
            assert!(!output.timed_out);
            assert_eq!(output.stdout.trim(), "out");
            assert_eq!(output.stderr.trim(), "oops");
            assert!(!output.success());
        }
    }

    /// **What is tested:** Killing a process that exceeds the timeout
    /// **Why it is tested:** A hanging artifact must not hang the harness once a timeout is configured
    /// **Test conditions:** `sh -c 'exec sleep 10'` with a 200ms timeout
    /// **Expectations:** timed_out set, no exit code, elapsed well below the sleep duration
    #[cfg(unix)]
    #[test]
    fn test_system_executor_timeout_kills_child() {
        let executor =
            SystemProcessExecutor::new().with_timeout(Some(Duration::from_millis(200)));
        let invocation = Invocation::new("sh").args(["-c", "exec sleep 10"]);

        let output = executor.execute(&invocation).expect("sh should spawn");
        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
        assert!(output.elapsed >= Duration::from_millis(200));
        assert!(output.elapsed < Duration::from_secs(5));
    }
}
