// src/run/eventually.rs

//! Retry-until-success executor.
//!
//! [`Eventually`] wraps a cancellation-aware operation and keeps attempting
//! it on a fixed interval until it succeeds or the overall timeout elapses.
//!
//! - At most one attempt is in flight at a time. Ticks that fire while an
//!   attempt is outstanding are dropped, so a slow operation degrades to
//!   back-to-back attempts instead of piling up.
//! - Every attempt runs on its own Tokio task and reports back through a
//!   oneshot channel; the scheduling loop never blocks on the operation.
//! - Failures are folded into an [`AggregatedError`] and only surface as
//!   part of [`HackrunError::ConditionNeverMet`].
//! - The caller's token is handed down to each attempt but is not polled by
//!   the loop itself. An attempt still outstanding when the loop returns is
//!   cancelled through its child token and aborted; its late report is
//!   discarded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, warn};

use crate::errors::{AggregatedError, HackrunError, Result};
use crate::run::FAR_FUTURE;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wrap `op` so it is retried until success. See [`Eventually`].
pub fn eventually<F, Fut>(op: F) -> Eventually<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Eventually::new(op)
}

/// Retry executor for a cancellation-aware operation.
///
/// Defaults: 1s interval, 10s timeout. The first attempt starts one interval
/// after [`Eventually::run`] is called.
#[derive(Debug)]
pub struct Eventually<F> {
    op: Arc<F>,
    interval: Duration,
    timeout: Duration,
}

impl<F, Fut> Eventually<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub fn new(op: F) -> Self {
        Self {
            op: Arc::new(op),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Time to wait before each attempt.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Upper bound on the whole retry cycle, across all attempts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attempt the operation until it succeeds or the timeout elapses.
    ///
    /// Returns `Ok(())` on the first successful attempt, or
    /// [`HackrunError::ConditionNeverMet`] carrying every failure seen.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<()> {
        let started = Instant::now();

        let deadline = time::sleep_until(started + self.timeout.min(FAR_FUTURE));
        tokio::pin!(deadline);

        // interval_at panics on a zero period; clamp so a misconfigured
        // interval still means "as fast as possible".
        let period = self.interval.clamp(Duration::from_millis(1), FAR_FUTURE);
        let mut ticker = time::interval_at(started + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut trail = AggregatedError::new();
        let mut outstanding: Option<OutstandingAttempt> = None;
        let mut attempts: u64 = 0;

        loop {
            tokio::select! {
                biased;

                outcome = report_of(&mut outstanding) => {
                    if let Some(mut attempt) = outstanding.take() {
                        attempt.settled = true;
                    }

                    match outcome {
                        Ok(()) => {
                            debug!(
                                attempts,
                                elapsed = ?started.elapsed(),
                                "condition met"
                            );
                            return Ok(());
                        }
                        Err(err) => {
                            debug!(attempt = attempts, error = %err, "attempt failed");
                            trail.push(err);
                        }
                    }
                }

                _ = &mut deadline => {
                    warn!(
                        attempts,
                        failures = trail.len(),
                        timeout = ?self.timeout,
                        in_flight = outstanding.is_some(),
                        "condition never met before timeout"
                    );
                    return Err(HackrunError::ConditionNeverMet(trail));
                }

                _ = ticker.tick(), if outstanding.is_none() => {
                    attempts += 1;
                    outstanding = Some(self.launch(attempts, ctx));
                }
            }
        }
    }

    fn launch(&self, ordinal: u64, ctx: &CancellationToken) -> OutstandingAttempt {
        let token = ctx.child_token();
        let (report_tx, report_rx) = oneshot::channel();

        let op = Arc::clone(&self.op);
        let attempt_ctx = token.clone();

        debug!(attempt = ordinal, "launching attempt");

        let handle = tokio::spawn(
            async move {
                let outcome = op(attempt_ctx).await;
                // The receiver is gone once the loop has returned.
                let _ = report_tx.send(outcome);
            }
            .instrument(debug_span!("attempt", attempt = ordinal)),
        );

        OutstandingAttempt {
            ordinal,
            token,
            handle,
            report: report_rx,
            settled: false,
        }
    }
}

/// Bookkeeping for the single in-flight attempt.
///
/// Dropping an unsettled attempt cancels its token and aborts its task.
struct OutstandingAttempt {
    ordinal: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
    report: oneshot::Receiver<Result<()>>,
    settled: bool,
}

impl Drop for OutstandingAttempt {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        debug!(attempt = self.ordinal, "abandoning outstanding attempt");
        self.token.cancel();
        self.handle.abort();
    }
}

/// Resolve with the outstanding attempt's outcome; pend forever when idle.
async fn report_of(outstanding: &mut Option<OutstandingAttempt>) -> Result<()> {
    let Some(attempt) = outstanding.as_mut() else {
        return std::future::pending().await;
    };

    match (&mut attempt.report).await {
        Ok(outcome) => outcome,
        Err(_) => Err(HackrunError::TaskPanicked(format!(
            "attempt {} ended without reporting an outcome",
            attempt.ordinal
        ))),
    }
}
