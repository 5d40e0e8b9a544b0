// src/cli.rs

//! CLI argument parsing using `clap`.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `hackrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hackrun",
    version,
    about = "Run deploy helper commands with retries, heartbeats and cancellation.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HACKRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a single command.
    Exec(ExecArgs),
    /// Run the stages of a plan file.
    Plan(PlanArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    /// Environment override for the command (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,

    /// Retry the command until it succeeds or `--timeout` elapses.
    #[arg(long)]
    pub eventually: bool,

    /// Time between attempts when `--eventually` is set.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, default_value = "1s")]
    pub interval: Duration,

    /// Overall retry budget when `--eventually` is set.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, default_value = "10s")]
    pub timeout: Duration,

    /// Period of the "still running" heartbeat (logged at debug).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, default_value = "5s")]
    pub heartbeat: Duration,

    /// Command and arguments, after `--`.
    #[arg(required = true, trailing_var_arg = true, value_name = "ARGV")]
    pub argv: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Path to the plan file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Hackrun.toml")]
    pub config: String,

    /// Parse + validate, print the plan, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;

    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }

    Ok((key.to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
