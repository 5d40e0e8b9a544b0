// crates/test-utils/src/probe.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hackrun::errors::HackrunError;
use hackrun::run::BoxTaskFuture;
use tokio_util::sync::CancellationToken;

/// Instrumented operation for retry tests.
///
/// Counts how many attempts started, how many are running right now, and the
/// highest number ever running at once.
#[derive(Debug, Clone, Default)]
pub struct AttemptProbe {
    state: Arc<ProbeState>,
}

#[derive(Debug, Default)]
struct ProbeState {
    started: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    cancelled: AtomicUsize,
}

/// How each probed attempt behaves.
#[derive(Debug, Clone, Copy)]
pub struct Behaviour {
    /// Simulated work per attempt.
    pub work: Duration,
    /// First attempt (1-based) that succeeds; `None` means always fail.
    pub succeed_on: Option<usize>,
}

impl Behaviour {
    pub fn always_fail(work: Duration) -> Self {
        Self { work, succeed_on: None }
    }

    pub fn succeed_on(attempt: usize, work: Duration) -> Self {
        Self { work, succeed_on: Some(attempt) }
    }
}

/// Decrements the active counter when the attempt ends or is dropped.
pub struct ActiveGuard {
    state: Arc<ProbeState>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AttemptProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of an attempt; returns its 1-based ordinal.
    pub fn enter(&self) -> (usize, ActiveGuard) {
        let ordinal = self.state.started.fetch_add(1, Ordering::SeqCst) + 1;
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);
        (
            ordinal,
            ActiveGuard {
                state: Arc::clone(&self.state),
            },
        )
    }

    pub fn attempts(&self) -> usize {
        self.state.started.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }

    /// Attempts that observed their token cancelled while working.
    pub fn cancelled(&self) -> usize {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Build an operation suitable for `hackrun::run::eventually`.
    pub fn operation(
        &self,
        behaviour: Behaviour,
    ) -> impl Fn(CancellationToken) -> BoxTaskFuture + Send + Sync + 'static {
        let probe = self.clone();
        move |ctx: CancellationToken| -> BoxTaskFuture {
            let probe = probe.clone();
            Box::pin(async move {
                let (ordinal, _guard) = probe.enter();

                tokio::select! {
                    _ = tokio::time::sleep(behaviour.work) => {}
                    _ = ctx.cancelled() => {
                        probe.state.cancelled.fetch_add(1, Ordering::SeqCst);
                        return Err(HackrunError::Cancelled);
                    }
                }

                match behaviour.succeed_on {
                    Some(k) if ordinal >= k => Ok(()),
                    _ => Err(HackrunError::Other(anyhow::anyhow!(
                        "attempt {ordinal} failed"
                    ))),
                }
            })
        }
    }
}
