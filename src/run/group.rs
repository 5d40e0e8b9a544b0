// src/run/group.rs

//! Fan-out and serial task groups.
//!
//! The concurrent helpers spawn every task on a [`JoinSet`] and hand each one
//! a child of the group token. The first failure cancels that token; siblings
//! only notice if they watch it. The group always waits for every task before
//! returning the first error in completion order.

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{HackrunError, Result};
use crate::run::task::Task;

/// Run `tasks` concurrently under a fresh token.
pub async fn concurrently(tasks: Vec<Task>) -> Result<()> {
    concurrently_with_context(&CancellationToken::new(), tasks).await
}

/// Run `tasks` concurrently; the first failure cancels the token the
/// remaining tasks were given. Cancelling `ctx` reaches them too.
pub async fn concurrently_with_context(ctx: &CancellationToken, tasks: Vec<Task>) -> Result<()> {
    let group = ctx.child_token();
    let mut set = JoinSet::new();

    debug!(tasks = tasks.len(), "starting concurrent group");

    for task in tasks {
        set.spawn(task.call(group.clone()));
    }

    let mut first_error: Option<HackrunError> = None;

    while let Some(joined) = set.join_next().await {
        let Err(err) = joined.unwrap_or_else(|e| Err(join_failure(e))) else {
            continue;
        };

        if first_error.is_none() {
            debug!(error = %err, "task failed; cancelling group");
            group.cancel();
            first_error = Some(err);
        } else {
            debug!(error = %err, "additional task failure after group cancellation");
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Run `tasks` one after another, stopping at the first failure.
pub async fn serially(tasks: Vec<Task>) -> Result<()> {
    serially_with_context(&CancellationToken::new(), tasks).await
}

/// Run `tasks` one after another with `ctx`, stopping at the first failure.
/// Tasks after the failing one are never started; a panicking task counts
/// as a failure.
pub async fn serially_with_context(ctx: &CancellationToken, tasks: Vec<Task>) -> Result<()> {
    let total = tasks.len();

    for (index, task) in tasks.into_iter().enumerate() {
        if let Err(err) = run_contained(task, ctx).await {
            debug!(
                task = index + 1,
                total,
                error = %err,
                "serial task failed; skipping the rest"
            );
            return Err(err);
        }
    }

    Ok(())
}

/// Run one task on its own tokio task so a panic surfaces as an error.
///
/// The single-entry set aborts the task if this future is dropped.
async fn run_contained(task: Task, ctx: &CancellationToken) -> Result<()> {
    let mut set = JoinSet::new();
    set.spawn(task.call(ctx.clone()));

    match set.join_next().await {
        Some(joined) => joined.unwrap_or_else(|e| Err(join_failure(e))),
        None => Ok(()),
    }
}

fn join_failure(err: JoinError) -> HackrunError {
    if err.is_panic() {
        warn!("task in group panicked");
        HackrunError::TaskPanicked(err.to_string())
    } else {
        HackrunError::Cancelled
    }
}
