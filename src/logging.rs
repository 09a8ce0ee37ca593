// Logging module - line-prefixed sink for executor activity
//
// Application-level diagnostics go through `tracing`; the executor
// additionally writes one plain line per request and response to a LogSink so
// the replay traffic can be tee'd to stderr, a file, or an in-memory buffer
// under test without pulling the tracing machinery into assertions.

use crate::util::truncate_utf8_safe;
use chrono::Utc;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Cap on a single sink line. Response bodies can be megabytes; the sink is a
/// traffic journal, not a capture.
const MAX_LINE_BYTES: usize = 2048;

/// A line-oriented log sink shared across tasks.
///
/// Every line is stamped and prefixed, e.g. `14:02:11.042 [http] GET https://…`.
#[derive(Clone)]
pub struct LogSink {
    prefix: String,
    device: Arc<Mutex<dyn Write + Send>>,
}

impl LogSink {
    /// Create a sink writing to the given device.
    pub fn new(prefix: impl Into<String>, device: impl Write + Send + 'static) -> Self {
        Self {
            prefix: prefix.into(),
            device: Arc::new(Mutex::new(device)),
        }
    }

    /// Sink lines to stderr (the default for the CLI).
    pub fn stderr(prefix: impl Into<String>) -> Self {
        Self::new(prefix, std::io::stderr())
    }

    /// Sink lines to a shared in-memory buffer. Returns the sink and the
    /// buffer so tests can read back what was written.
    pub fn buffer(prefix: impl Into<String>) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Self {
            prefix: prefix.into(),
            device: Arc::new(Mutex::new(SharedBuffer(buf.clone()))),
        };
        (sink, buf)
    }

    /// Write a single line. Write failures are swallowed: a dead sink must
    /// never take the replay down with it.
    pub fn line(&self, message: &str) {
        let message = truncate_utf8_safe(message, MAX_LINE_BYTES);
        let stamp = Utc::now().format("%H:%M:%S%.3f");
        let mut device = match self.device.lock() {
            Ok(device) => device,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(device, "{} [{}] {}", stamp, self.prefix, message);
    }
}

/// Adapter so a shared Vec<u8> can be handed out alongside the sink.
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = match self.0.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_carry_prefix_and_message() {
        let (sink, buf) = LogSink::buffer("http");
        sink.line("GET https://github.com/JackDanger");
        sink.line("200 OK");

        let written = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[http] GET https://github.com/JackDanger"));
        assert!(lines[1].contains("[http] 200 OK"));
    }

    #[test]
    fn test_long_lines_are_capped() {
        let (sink, buf) = LogSink::buffer("http");
        sink.line(&"x".repeat(MAX_LINE_BYTES * 2));

        let written = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        // Stamp and prefix add a few dozen bytes on top of the capped message
        assert!(written.len() < MAX_LINE_BYTES + 64);
    }

    #[test]
    fn test_clones_share_the_device() {
        let (sink, buf) = LogSink::buffer("a");
        let clone = sink.clone();
        sink.line("one");
        clone.line("two");

        let written = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(written.contains("one"));
        assert!(written.contains("two"));
    }
}
