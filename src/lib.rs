// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod kubectl;
pub mod logging;
pub mod plan;
pub mod run;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, ExecArgs, PlanArgs};
use crate::config::PlanFile;
use crate::config::loader::load_and_validate;
use crate::plan::PlanRunner;
use crate::run::{CapturedOutput, Cmd, eventually, pretty_argv};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the root cancellation token (cancelled on Ctrl-C)
/// - the `exec` subcommand (one command, optionally retried)
/// - the `plan` subcommand (config loading + plan runner)
pub async fn run(args: CliArgs) -> Result<()> {
    let ctx = CancellationToken::new();

    // Ctrl-C → cancel everything still running.
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received; cancelling");
            ctx.cancel();
        });
    }

    match args.command {
        Command::Exec(exec) => run_exec(exec, &ctx).await,
        Command::Plan(plan) => run_plan(plan, &ctx).await,
    }
}

async fn run_exec(args: ExecArgs, ctx: &CancellationToken) -> Result<()> {
    let cmd = Cmd::new(args.argv)
        .envs(args.env)
        .with_heartbeat(args.heartbeat);

    info!(argv = %pretty_argv(cmd.argv()), eventually = args.eventually, "exec");

    let output = if args.eventually {
        run_eventually(cmd, args.interval, args.timeout, ctx).await?
    } else {
        cmd.run_with_output(ctx).await?
    };

    print_output(&output);
    Ok(())
}

/// Retry `cmd` and hand back the output of the successful attempt.
async fn run_eventually(
    cmd: Cmd,
    interval: std::time::Duration,
    timeout: std::time::Duration,
    ctx: &CancellationToken,
) -> Result<CapturedOutput> {
    let cmd = Arc::new(cmd);
    let (output_tx, output_rx) = watch::channel(CapturedOutput::default());
    let output_tx = Arc::new(output_tx);

    eventually(move |ctx: CancellationToken| {
        let cmd = Arc::clone(&cmd);
        let output_tx = Arc::clone(&output_tx);
        async move {
            let output = cmd.run_with_output(&ctx).await?;
            output_tx.send_replace(output);
            Ok(())
        }
    })
    .with_interval(interval)
    .with_timeout(timeout)
    .run(ctx)
    .await?;

    let output = output_rx.borrow().clone();
    Ok(output)
}

fn print_output(output: &CapturedOutput) {
    if !output.stdout.is_empty() {
        print!("{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        eprint!("{}", output.stderr);
    }
}

async fn run_plan(args: PlanArgs, ctx: &CancellationToken) -> Result<()> {
    let path = PathBuf::from(&args.config);
    let plan = load_and_validate(&path)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    PlanRunner::new(plan).run(ctx).await?;
    Ok(())
}

/// Simple dry-run output: print stages, steps and their commands.
fn print_dry_run(plan: &PlanFile) {
    println!("hackrun dry-run");
    println!(
        "  config.interval = {}",
        humantime::format_duration(plan.config.interval)
    );
    println!(
        "  config.timeout = {}",
        humantime::format_duration(plan.config.timeout)
    );
    println!(
        "  config.heartbeat = {}",
        humantime::format_duration(plan.config.heartbeat)
    );
    println!();

    println!("stages ({}):", plan.stages.len());
    for stage in &plan.stages {
        println!("  - {} ({:?})", stage.name, stage.mode);
        for step in &stage.steps {
            println!("      - {}", step.name);
            println!("          argv: {}", pretty_argv(&step.argv));
            if !step.env.is_empty() {
                let keys: Vec<_> = step.env.keys().collect();
                println!("          env: {:?}", keys);
            }
            if step.eventually {
                println!(
                    "          eventually: every {} for up to {}",
                    humantime::format_duration(step.effective_interval(&plan.config)),
                    humantime::format_duration(step.effective_timeout(&plan.config))
                );
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
