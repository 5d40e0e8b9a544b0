// crates/test-utils/src/lib.rs

//! Shared helpers for the integration tests.
//!
//! - [`builders`]: fluent builders for plan files.
//! - [`probe`]: an instrumented retry operation that counts attempts.
//! - [`logs`]: a thread-local subscriber capturing formatted log lines.

pub mod builders;
pub mod logs;
pub mod probe;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Output goes through the test writer, so it only shows for failing tests
/// unless run with `-- --nocapture`. The level comes from `RUST_LOG`
/// (default `info`).
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}
