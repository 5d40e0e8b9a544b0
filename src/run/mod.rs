// src/run/mod.rs

//! Execution primitives.
//!
//! - [`process`] supervises a single external command ([`Cmd`]).
//! - [`eventually`] retries an operation until it succeeds or times out
//!   ([`Eventually`]).
//! - [`group`] runs several [`Task`]s concurrently or serially.
//! - [`task`] defines the [`Task`] unit accepted by the groups.
//!
//! Each layer composes with the next: a `Cmd` can be retried by
//! `Eventually`, and both can be handed to a group as a `Task`.

pub mod eventually;
pub mod group;
pub mod process;
pub mod task;

pub use eventually::{Eventually, eventually};
pub use group::{concurrently, concurrently_with_context, serially, serially_with_context};
pub use process::{CapturedOutput, Cmd, pretty_argv};
pub use task::{BoxTaskFuture, Task};

use std::time::Duration;

/// Upper bound for any timer period or deadline offset (about 30 years).
///
/// Longer durations mean "never" and are clamped so `Instant` arithmetic
/// cannot overflow.
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

