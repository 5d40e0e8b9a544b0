// tests/cli.rs

use std::time::Duration;

use clap::Parser;

use hackrun::cli::{CliArgs, Command, LogLevel};
use hackrun::logging::resolve_level;

#[test]
fn exec_collects_argv_after_double_dash() {
    let args = CliArgs::try_parse_from([
        "hackrun", "exec", "--env", "A=1", "--env", "B=x=y", "--", "kubectl", "get", "pods",
        "-o", "json",
    ])
    .expect("valid exec invocation");

    let Command::Exec(exec) = args.command else {
        panic!("expected exec subcommand");
    };

    assert_eq!(exec.argv, ["kubectl", "get", "pods", "-o", "json"]);
    assert_eq!(
        exec.env,
        [
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), "x=y".to_string())
        ]
    );
    assert!(!exec.eventually);
    assert_eq!(exec.interval, Duration::from_secs(1));
    assert_eq!(exec.timeout, Duration::from_secs(10));
    assert_eq!(exec.heartbeat, Duration::from_secs(5));
}

#[test]
fn exec_accepts_humantime_durations() {
    let args = CliArgs::try_parse_from([
        "hackrun",
        "--log-level",
        "debug",
        "exec",
        "--eventually",
        "--interval",
        "500ms",
        "--timeout",
        "2m",
        "--",
        "true",
    ])
    .expect("valid exec invocation");

    assert!(matches!(args.log_level, Some(LogLevel::Debug)));

    let Command::Exec(exec) = args.command else {
        panic!("expected exec subcommand");
    };
    assert!(exec.eventually);
    assert_eq!(exec.interval, Duration::from_millis(500));
    assert_eq!(exec.timeout, Duration::from_secs(120));
}

#[test]
fn exec_rejects_malformed_input() {
    assert!(CliArgs::try_parse_from(["hackrun", "exec"]).is_err());
    assert!(CliArgs::try_parse_from(["hackrun", "exec", "--env", "NOEQUALS", "--", "true"]).is_err());
    assert!(CliArgs::try_parse_from(["hackrun", "exec", "--env", "=v", "--", "true"]).is_err());
    assert!(
        CliArgs::try_parse_from(["hackrun", "exec", "--interval", "soon", "--", "true"]).is_err()
    );
}

#[test]
fn plan_defaults_to_hackrun_toml() {
    let args = CliArgs::try_parse_from(["hackrun", "plan"]).expect("valid plan invocation");

    let Command::Plan(plan) = args.command else {
        panic!("expected plan subcommand");
    };
    assert_eq!(plan.config, "Hackrun.toml");
    assert!(!plan.dry_run);

    let args = CliArgs::try_parse_from(["hackrun", "plan", "--config", "demo.toml", "--dry-run"])
        .expect("valid plan invocation");
    let Command::Plan(plan) = args.command else {
        panic!("expected plan subcommand");
    };
    assert_eq!(plan.config, "demo.toml");
    assert!(plan.dry_run);
}

#[test]
fn log_level_prefers_flag_then_env_then_info() {
    assert_eq!(
        resolve_level(Some(LogLevel::Warn), Some("trace")),
        tracing::Level::WARN
    );
    assert_eq!(resolve_level(None, Some("DEBUG")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some("warning")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("chatty")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}
