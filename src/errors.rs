// src/errors.rs

//! Crate-wide error type and helpers.
//!
//! Every primitive in [`crate::run`] returns [`Result`], so a process
//! invocation can be handed to [`crate::run::Eventually`] or a task group
//! without any conversion glue.

use std::fmt;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HackrunError {
    /// The retried operation never succeeded before the deadline.
    #[error("condition never met: {0}")]
    ConditionNeverMet(AggregatedError),

    /// The execution context was cancelled before the operation completed.
    #[error("operation cancelled")]
    Cancelled,

    /// An external command failed to run or exited unsuccessfully.
    #[error("run `{argv}`: {failure}{}", render_output(.stdout, .stderr))]
    Process {
        argv: String,
        #[source]
        failure: ProcessFailure,
        stdout: String,
        stderr: String,
    },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON decoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HackrunError {
    /// Failures recorded by a retry cycle that timed out, in launch order.
    pub fn attempt_errors(&self) -> Option<&[HackrunError]> {
        match self {
            HackrunError::ConditionNeverMet(trail) => Some(trail.errors()),
            _ => None,
        }
    }

    /// Exit code of a failed process, when it exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            HackrunError::Process {
                failure: ProcessFailure::Exit(status),
                ..
            } => status.code(),
            _ => None,
        }
    }
}

/// Why a single process invocation did not succeed.
#[derive(Error, Debug)]
pub enum ProcessFailure {
    #[error("spawn: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("wait: {0}")]
    Wait(#[source] std::io::Error),

    #[error("{0}")]
    Exit(ExitStatus),

    #[error("terminated on cancellation")]
    Terminated,

    #[error("supervisor exited without reporting an outcome")]
    Lost,
}

fn render_output(stdout: &str, stderr: &str) -> String {
    let mut rendered = String::new();
    if !stdout.is_empty() {
        rendered.push_str("\nstdout: ");
        rendered.push_str(stdout.trim_end());
    }
    if !stderr.is_empty() {
        rendered.push_str("\nstderr: ");
        rendered.push_str(stderr.trim_end());
    }
    rendered
}

/// Ordered failure trail of one retry cycle.
#[derive(Debug, Default)]
pub struct AggregatedError {
    errors: Vec<HackrunError>,
}

impl AggregatedError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: HackrunError) {
        self.errors.push(err);
    }

    pub fn errors(&self) -> &[HackrunError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<HackrunError> {
        self.errors
    }
}

impl fmt::Display for AggregatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no attempt completed"),
            1 => write!(f, "1 error occurred:\n\t* {}", self.errors[0]),
            n => {
                write!(f, "{n} errors occurred:")?;
                for err in &self.errors {
                    write!(f, "\n\t* {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AggregatedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .last()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HackrunError>;
