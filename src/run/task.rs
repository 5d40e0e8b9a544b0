// src/run/task.rs

//! Units of work accepted by the task group helpers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::errors::Result;

/// Boxed, sendable future produced by a [`Task`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

type PlainFn = Box<dyn FnOnce() -> BoxTaskFuture + Send + 'static>;
type ContextFn = Box<dyn FnOnce(CancellationToken) -> BoxTaskFuture + Send + 'static>;

/// A single-shot unit of work.
///
/// A task is either a plain fallible operation or one that receives the
/// group's [`CancellationToken`] so it can stop early when a sibling fails.
/// It is consumed by [`Task::call`].
pub enum Task {
    Plain(PlainFn),
    WithContext(ContextFn),
}

impl Task {
    /// Wrap an operation that ignores cancellation.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Task::Plain(Box::new(move || -> BoxTaskFuture { Box::pin(f()) }))
    }

    /// Wrap an operation that observes the shared cancellation token.
    pub fn with_context<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Task::WithContext(Box::new(move |ctx: CancellationToken| -> BoxTaskFuture { Box::pin(f(ctx)) }))
    }

    /// Build the task's future. Plain tasks never see `ctx`.
    pub fn call(self, ctx: CancellationToken) -> BoxTaskFuture {
        match self {
            Task::Plain(f) => f(),
            Task::WithContext(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Plain(_) => f.write_str("Task::Plain"),
            Task::WithContext(_) => f.write_str("Task::WithContext"),
        }
    }
}
