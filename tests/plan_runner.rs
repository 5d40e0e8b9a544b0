// tests/plan_runner.rs

use std::error::Error;
use std::fs;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use hackrun::errors::HackrunError;
use hackrun::plan::PlanRunner;
use hackrun_test_utils::builders::{PlanBuilder, StageBuilder, StepBuilder};
use hackrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn serial_stage_runs_steps_in_declaration_order() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let log = dir.path().join("order.log");
    let append = |word: &str| format!("sleep 0.05; echo {word} >> {}", log.display());

    let plan = PlanBuilder::new()
        .with_stage(
            StageBuilder::new("ordered")
                .serial()
                .step(StepBuilder::sh("one", &append("one")).build())
                .step(StepBuilder::sh("two", &append("two")).build())
                .step(StepBuilder::sh("three", &append("three")).build())
                .build(),
        )
        .build();

    let runner = PlanRunner::new(plan);
    let names: Vec<&str> = runner.plan().steps().map(|step| step.name.as_str()).collect();
    assert_eq!(names, ["one", "two", "three"]);

    with_timeout(runner.run(&CancellationToken::new())).await?;

    assert_eq!(fs::read_to_string(&log)?, "one\ntwo\nthree\n");

    Ok(())
}

#[tokio::test]
async fn failing_stage_stops_later_stages() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let marker = dir.path().join("ran");

    let plan = PlanBuilder::new()
        .with_stage(
            StageBuilder::new("broken")
                .step(StepBuilder::sh("fail", "echo nope >&2; exit 4").build())
                .build(),
        )
        .with_stage(
            StageBuilder::new("never")
                .step(StepBuilder::sh("touch", &format!("touch {}", marker.display())).build())
                .build(),
        )
        .build();

    let err = with_timeout(PlanRunner::new(plan).run(&CancellationToken::new()))
        .await
        .expect_err("first stage fails");

    assert_eq!(err.exit_code(), Some(4));
    assert!(err.to_string().contains("stderr: nope"));
    assert!(!marker.exists(), "later stage must not run");

    Ok(())
}

/// A retried step keeps going until the command starts succeeding.
#[tokio::test]
async fn eventually_step_succeeds_after_retries() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let flag = dir.path().join("flag");

    // Fails the first time (creating the flag), succeeds the second.
    let script = format!(
        "if [ -f {flag} ]; then exit 0; else touch {flag}; exit 1; fi",
        flag = flag.display()
    );

    let plan = PlanBuilder::new()
        .with_stage(
            StageBuilder::new("wait")
                .step(
                    StepBuilder::sh("flaky", &script)
                        .eventually()
                        .interval(Duration::from_millis(50))
                        .timeout(Duration::from_secs(5))
                        .build(),
                )
                .build(),
        )
        .build();

    with_timeout(PlanRunner::new(plan).run(&CancellationToken::new())).await?;
    assert!(flag.exists());

    Ok(())
}

#[tokio::test]
async fn eventually_step_reports_every_failure_at_timeout() -> TestResult {
    init_tracing();

    let plan = PlanBuilder::new()
        .with_stage(
            StageBuilder::new("wait")
                .step(
                    StepBuilder::sh("hopeless", "exit 2")
                        .eventually()
                        .interval(Duration::from_millis(50))
                        .timeout(Duration::from_millis(400))
                        .build(),
                )
                .build(),
        )
        .build();

    let err = with_timeout(PlanRunner::new(plan).run(&CancellationToken::new()))
        .await
        .expect_err("command never succeeds");

    let trail = err.attempt_errors().expect("retry trail");
    assert!(!trail.is_empty());
    assert!(trail.iter().all(|e| e.exit_code() == Some(2)));

    Ok(())
}

#[tokio::test]
async fn failure_in_concurrent_stage_cancels_sibling_commands() -> TestResult {
    init_tracing();

    let plan = PlanBuilder::new()
        .with_stage(
            StageBuilder::new("fanout")
                .step(StepBuilder::new("long", &["sleep", "30"]).build())
                .step(StepBuilder::sh("fails", "sleep 0.1; exit 1").build())
                .build(),
        )
        .build();

    let started = Instant::now();
    let err = with_timeout(PlanRunner::new(plan).run(&CancellationToken::new()))
        .await
        .expect_err("one step fails");

    assert_eq!(err.exit_code(), Some(1));
    assert!(started.elapsed() < Duration::from_secs(5));

    Ok(())
}

#[tokio::test]
async fn step_env_reaches_the_command() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let out = dir.path().join("env.out");

    let plan = PlanBuilder::new()
        .with_stage(
            StageBuilder::new("env")
                .step(
                    StepBuilder::sh(
                        "print",
                        &format!("printf '%s' \"$TARGET\" > {}", out.display()),
                    )
                    .env("TARGET", "staging")
                    .build(),
                )
                .build(),
        )
        .build();

    with_timeout(PlanRunner::new(plan).run(&CancellationToken::new())).await?;
    assert_eq!(fs::read_to_string(&out)?, "staging");

    Ok(())
}

#[tokio::test]
async fn cancelled_context_stops_the_plan() -> TestResult {
    init_tracing();

    let plan = PlanBuilder::new()
        .with_stage(
            StageBuilder::new("slow")
                .step(StepBuilder::new("sleep", &["sleep", "30"]).build())
                .build(),
        )
        .build();

    let ctx = CancellationToken::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let result = with_timeout(PlanRunner::new(plan).run(&ctx)).await;
    assert!(matches!(result, Err(HackrunError::Cancelled)), "got {result:?}");

    Ok(())
}
