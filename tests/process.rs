// tests/process.rs

use std::error::Error;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use hackrun::errors::{HackrunError, ProcessFailure};
use hackrun::run::{Cmd, pretty_argv};
use hackrun_test_utils::logs::capture_debug_logs;
use hackrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn sh(script: &str) -> Cmd {
    Cmd::new(["sh", "-c", script])
}

#[tokio::test]
async fn captures_stdout_and_stderr_separately() -> TestResult {
    init_tracing();

    let output = sh("echo out; echo err >&2")
        .run_with_output(&CancellationToken::new())
        .await?;

    assert_eq!(output.stdout, "out\n");
    assert_eq!(output.stderr, "err\n");

    Ok(())
}

/// A failing command's error must carry what it printed.
#[tokio::test]
async fn non_zero_exit_error_includes_stdout() -> TestResult {
    init_tracing();

    let err = sh("echo hello; exit 3")
        .run(&CancellationToken::new())
        .await
        .expect_err("command exits non-zero");

    let message = err.to_string();
    assert!(message.contains("hello"), "got: {message}");
    assert!(message.contains("stdout: hello"), "got: {message}");
    assert!(!message.contains("stderr:"), "empty stderr is omitted: {message}");
    assert_eq!(err.exit_code(), Some(3));

    match &err {
        HackrunError::Process {
            failure: ProcessFailure::Exit(status),
            stdout,
            stderr,
            ..
        } => {
            assert!(!status.success());
            assert_eq!(stdout, "hello\n");
            assert!(stderr.is_empty());
        }
        other => panic!("expected process exit failure, got {other:?}"),
    }

    // The underlying cause stays reachable.
    assert!(err.source().is_some());

    Ok(())
}

#[tokio::test]
async fn non_zero_exit_error_includes_stderr() -> TestResult {
    init_tracing();

    let err = sh("echo oops >&2; exit 1")
        .run(&CancellationToken::new())
        .await
        .expect_err("command exits non-zero");

    let message = err.to_string();
    assert!(message.contains("stderr: oops"), "got: {message}");
    assert!(!message.contains("stdout:"), "empty stdout is omitted: {message}");

    Ok(())
}

#[tokio::test]
async fn env_overrides_extend_inherited_environment() -> TestResult {
    init_tracing();

    let cmd = sh(r#"printf '%s' "$HACKRUN_GREETING"; test -n "$PATH""#)
        .env("HACKRUN_GREETING", "hi there");

    assert_eq!(cmd.env_overrides().len(), 1);
    assert_eq!(
        cmd.env_overrides().get("HACKRUN_GREETING").map(String::as_str),
        Some("hi there")
    );

    let output = cmd.run_with_output(&CancellationToken::new()).await?;

    assert_eq!(output.stdout, "hi there");

    Ok(())
}

#[tokio::test]
async fn cancellation_terminates_child_process() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let pidfile = dir.path().join("pid");
    let script = format!("echo $$ > {}; exec sleep 30", pidfile.display());

    let ctx = CancellationToken::new();
    let canceller = ctx.clone();
    let pidfile_probe = pidfile.clone();
    tokio::spawn(async move {
        // Wait for the child to record its pid before cancelling.
        for _ in 0..200 {
            if std::fs::read_to_string(&pidfile_probe).is_ok_and(|s| !s.trim().is_empty()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        canceller.cancel();
    });

    let started = Instant::now();
    let result = with_timeout(sh(&script).run(&ctx)).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(HackrunError::Cancelled)), "got {result:?}");
    assert!(elapsed < Duration::from_secs(5), "cancellation took {elapsed:?}");

    let pid = std::fs::read_to_string(&pidfile)?.trim().to_string();

    // The child must be gone shortly after cancellation.
    let mut gone = false;
    for _ in 0..100 {
        if sh(&format!("kill -0 {pid}"))
            .run(&CancellationToken::new())
            .await
            .is_err()
        {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(gone, "process {pid} still alive after cancellation");

    Ok(())
}

#[tokio::test]
async fn already_cancelled_context_returns_promptly() -> TestResult {
    init_tracing();

    let ctx = CancellationToken::new();
    ctx.cancel();

    let started = Instant::now();
    let result = Cmd::new(["sleep", "30"]).run(&ctx).await;

    assert!(matches!(result, Err(HackrunError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));

    Ok(())
}

#[tokio::test]
async fn heartbeat_does_not_delay_completion() -> TestResult {
    init_tracing();

    let started = Instant::now();
    sh("sleep 0.3")
        .with_heartbeat(Duration::from_millis(50))
        .run(&CancellationToken::new())
        .await?;

    assert!(started.elapsed() < Duration::from_secs(3));

    Ok(())
}

#[tokio::test]
async fn heartbeat_is_logged_while_the_process_runs() -> TestResult {
    let (logs, _guard) = capture_debug_logs();

    sh("sleep 0.3")
        .with_heartbeat(Duration::from_millis(50))
        .run(&CancellationToken::new())
        .await?;

    let beats = logs.count("still running");
    assert!(beats >= 3, "expected several heartbeats, got {beats}:\n{}", logs.contents());
    assert!(logs.contents().contains("elapsed="));

    Ok(())
}

#[tokio::test]
async fn huge_heartbeat_period_is_accepted() -> TestResult {
    init_tracing();

    sh("exit 0")
        .with_heartbeat(Duration::MAX)
        .run(&CancellationToken::new())
        .await?;

    Ok(())
}

#[tokio::test]
async fn missing_binary_is_a_spawn_failure() -> TestResult {
    init_tracing();

    let err = Cmd::new(["hackrun-definitely-not-a-real-binary"])
        .run(&CancellationToken::new())
        .await
        .expect_err("binary does not exist");

    assert!(matches!(
        err,
        HackrunError::Process {
            failure: ProcessFailure::Spawn(_),
            ..
        }
    ));
    assert!(err.to_string().contains("spawn"));

    Ok(())
}

#[tokio::test]
async fn empty_argv_is_rejected() -> TestResult {
    init_tracing();

    let err = Cmd::new(Vec::<String>::new())
        .run(&CancellationToken::new())
        .await
        .expect_err("nothing to run");

    assert!(matches!(err, HackrunError::InvalidCommand(_)));

    Ok(())
}

/// The same `Cmd` can be run again; each run starts with empty buffers.
#[tokio::test]
async fn each_run_gets_fresh_buffers() -> TestResult {
    init_tracing();

    let cmd = sh("echo once");
    let ctx = CancellationToken::new();

    let first = cmd.run_with_output(&ctx).await?;
    let second = cmd.run_with_output(&ctx).await?;

    assert_eq!(first.stdout, "once\n");
    assert_eq!(second.stdout, "once\n");

    Ok(())
}

#[test]
fn pretty_argv_truncates_long_vectors() {
    assert_eq!(pretty_argv::<&str>(&[]), "");
    assert_eq!(pretty_argv(&["kubectl", "get", "pods"]), "kubectl get pods");

    let seven = ["a", "b", "c", "d", "e", "f", "g"];
    assert_eq!(pretty_argv(&seven), "a b c d e f g");

    let eight = ["a", "b", "c", "d", "e", "f", "g", "h"];
    assert_eq!(pretty_argv(&eight), "a b c d e f g ...");

    let ten: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(pretty_argv(&ten), "0 1 2 3 4 5 6 ...");
}
