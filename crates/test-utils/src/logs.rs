// crates/test-utils/src/logs.rs

use std::io;
use std::sync::{Arc, Mutex};

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt;

/// Shared buffer receiving formatted log lines.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Everything logged so far, as text.
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Number of log lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.buf.lock().expect("log buffer poisoned");
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture `debug`-and-above events emitted on the current thread.
///
/// The subscriber is thread-local and stays active until the guard drops,
/// so this pairs with current-thread runtimes (`#[tokio::test]` default).
pub fn capture_debug_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let buf = Arc::clone(&capture.buf);

    let subscriber = fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_writer(move || CaptureWriter {
            buf: Arc::clone(&buf),
        })
        .finish();

    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
