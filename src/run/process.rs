// src/run/process.rs

//! External command supervision.
//!
//! [`Cmd`] runs one command to completion using `tokio::process::Command`:
//!
//! - stdout and stderr are captured into separate buffers for the lifetime of
//!   the invocation and frozen into a [`CapturedOutput`] when it ends;
//! - a heartbeat is logged at `debug` while the process is running;
//! - cancelling the caller's token kills the child and returns
//!   [`HackrunError::Cancelled`] without waiting for it to exit;
//! - failures carry the captured output when there is any.

use std::collections::BTreeMap;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::errors::{HackrunError, ProcessFailure, Result};
use crate::run::FAR_FUTURE;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);

/// Maximum number of argv items rendered by [`pretty_argv`].
const MAX_ARGV_ITEMS: usize = 8;

/// Frozen stdout/stderr of a finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// An external command: argument vector plus environment overrides.
///
/// Overrides are applied on top of the inherited environment. A `Cmd` can
/// be run any number of times; each run gets fresh buffers.
#[derive(Debug, Clone)]
pub struct Cmd {
    argv: Vec<String>,
    env_overrides: BTreeMap<String, String>,
    heartbeat: Duration,
}

impl Cmd {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env_overrides: BTreeMap::new(),
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }

    /// Set an environment variable for the child process.
    ///
    /// The child still inherits the full parent environment; overrides are
    /// layered on top of it rather than replacing it.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            self.env_overrides.insert(key.into(), value.into());
        }
        self
    }

    /// Period of the "still running" heartbeat.
    pub fn with_heartbeat(mut self, period: Duration) -> Self {
        self.heartbeat = period;
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env_overrides
    }

    /// Run the command to completion, discarding its output on success.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<()> {
        self.run_with_output(ctx).await.map(|_| ())
    }

    /// Run the command to completion and hand back what it printed.
    pub async fn run_with_output(&self, ctx: &CancellationToken) -> Result<CapturedOutput> {
        let span = info_span!("run", argv = %pretty_argv(&self.argv));
        self.supervise(ctx).instrument(span).await
    }

    async fn supervise(&self, ctx: &CancellationToken) -> Result<CapturedOutput> {
        let command = self.command()?;

        // Cancelled on every exit path, which tears the child down even if
        // this future is dropped mid-run.
        let token = ctx.child_token();
        let _teardown = token.clone().drop_guard();

        let (done_tx, mut done_rx) = oneshot::channel();
        tokio::spawn(invoke(command, token, done_tx).in_current_span());

        let started = Instant::now();
        let period = self.heartbeat.clamp(Duration::from_millis(1), FAR_FUTURE);
        let mut heartbeat = time::interval_at(started + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Cancellation wins over the supervisor's "terminated" report.
                biased;

                _ = ctx.cancelled() => {
                    info!(
                        elapsed = %short_elapsed(started.elapsed()),
                        "cancelled; terminating process"
                    );
                    return Err(HackrunError::Cancelled);
                }

                done = &mut done_rx => {
                    let completion = done.unwrap_or(Completion {
                        status: Err(ProcessFailure::Lost),
                        output: CapturedOutput::default(),
                    });
                    return self.conclude(completion);
                }

                _ = heartbeat.tick() => {
                    debug!(elapsed = %short_elapsed(started.elapsed()), "still running");
                }
            }
        }
    }

    fn command(&self) -> Result<Command> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| HackrunError::InvalidCommand("empty argument vector".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&self.env_overrides)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        Ok(command)
    }

    fn conclude(&self, completion: Completion) -> Result<CapturedOutput> {
        let Completion { status, output } = completion;

        let failure = match status {
            Ok(status) if status.success() => return Ok(output),
            Ok(status) => ProcessFailure::Exit(status),
            Err(failure) => failure,
        };

        Err(HackrunError::Process {
            argv: pretty_argv(&self.argv),
            failure,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// What the supervising task reports back once the process is gone.
struct Completion {
    status: std::result::Result<ExitStatus, ProcessFailure>,
    output: CapturedOutput,
}

/// Spawn the process, drain its pipes, and report how it ended.
async fn invoke(mut command: Command, token: CancellationToken, done: oneshot::Sender<Completion>) {
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            let _ = done.send(Completion {
                status: Err(ProcessFailure::Spawn(err)),
                output: CapturedOutput::default(),
            });
            return;
        }
    };

    info!(pid = child.id(), "process started");

    let stdout = child.stdout.take().map(|pipe| tokio::spawn(capture(pipe)));
    let stderr = child.stderr.take().map(|pipe| tokio::spawn(capture(pipe)));

    let status = tokio::select! {
        status = child.wait() => status.map_err(ProcessFailure::Wait),
        _ = token.cancelled() => {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill process on cancellation");
            }
            Err(ProcessFailure::Terminated)
        }
    };

    match &status {
        Ok(exit) => info!(exit_code = exit.code(), success = exit.success(), "process exited"),
        Err(failure) => debug!(%failure, "process ended abnormally"),
    }

    let output = CapturedOutput {
        stdout: collect(stdout).await,
        stderr: collect(stderr).await,
    };

    let _ = done.send(Completion { status, output });
}

/// Append everything the pipe yields to a fresh buffer.
async fn capture<R>(mut pipe: R) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Err(err) = pipe.read_to_end(&mut buf).await {
        debug!(error = %err, "output pipe closed with error");
    }
    buf
}

async fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    match reader {
        Some(handle) => match handle.await {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        },
        None => String::new(),
    }
}

fn short_elapsed(elapsed: Duration) -> humantime::FormattedDuration {
    humantime::format_duration(Duration::from_secs(elapsed.as_secs()))
}

/// Render an argument vector for logs.
///
/// At most [`MAX_ARGV_ITEMS`] items are shown; when the vector is that long
/// or longer, the last shown item becomes `...`.
///
/// ```
/// use hackrun::run::pretty_argv;
///
/// assert_eq!(pretty_argv(&["kubectl", "get", "pods"]), "kubectl get pods");
/// ```
pub fn pretty_argv<S: AsRef<str>>(argv: &[S]) -> String {
    let n = argv.len().min(MAX_ARGV_ITEMS);
    let mut shown: Vec<&str> = argv[..n].iter().map(AsRef::as_ref).collect();

    if n == MAX_ARGV_ITEMS {
        shown[n - 1] = "...";
    }

    shown.join(" ")
}
