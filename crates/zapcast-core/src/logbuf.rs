//! Bounded in-memory log sink for the `/api/logs` endpoint.
//!
//! A `tracing_subscriber` layer captures INFO-and-above events into a ring
//! buffer of formatted lines. This replaces console-log scraping: the same
//! structured events that reach stdout are what the API serves.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Shared bounded buffer of recent log lines, newest last.
#[derive(Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        // A zero-capacity ring has nothing to serve; keep at least one line.
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&self, line: String) {
        let mut buf = self.inner.lock().expect("log buffer poisoned");
        while buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(line);
    }

    /// Snapshot of the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("log buffer poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Build the tracing layer that feeds this buffer.
    pub fn layer(&self) -> RingLayer {
        RingLayer { buffer: self.clone() }
    }
}

/// `tracing_subscriber` layer writing formatted events into a [`LogBuffer`].
pub struct RingLayer {
    buffer: LogBuffer,
}

impl<S: Subscriber> Layer<S> for RingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // DEBUG/TRACE would evict the lines operators actually want to see.
        if *meta.level() > Level::INFO {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let line = format!(
            "{} {:>5} {}: {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            meta.level(),
            meta.target(),
            visitor.out
        );
        self.buffer.push(line);
    }
}

/// Collects the `message` field plus any extra fields as `key=value`.
#[derive(Default)]
struct LineVisitor {
    out: String,
}

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            if self.out.is_empty() {
                let _ = write!(self.out, "{value:?}");
            } else {
                let mut msg = format!("{value:?}");
                std::mem::swap(&mut msg, &mut self.out);
                let _ = write!(self.out, " {msg}");
            }
        } else {
            if !self.out.is_empty() {
                self.out.push(' ');
            }
            let _ = write!(self.out, "{}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_snapshot() {
        let buf = LogBuffer::new(10);
        buf.push("one".into());
        buf.push("two".into());
        assert_eq!(buf.lines(), vec!["one", "two"]);
    }

    #[test]
    fn test_eviction_at_capacity() {
        let buf = LogBuffer::new(3);
        for i in 0..5 {
            buf.push(format!("line {i}"));
        }
        assert_eq!(buf.lines(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_zero_capacity_stays_bounded() {
        let buf = LogBuffer::new(0);
        for i in 0..100 {
            buf.push(format!("line {i}"));
        }
        assert_eq!(buf.lines(), vec!["line 99"], "must not grow without bound");
    }

    #[test]
    fn test_layer_captures_info_events() {
        use tracing_subscriber::layer::SubscriberExt;

        let buf = LogBuffer::new(16);
        let subscriber = tracing_subscriber::registry().with(buf.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("campaign enqueued");
            tracing::debug!("noise that must not appear");
            tracing::warn!(targets = 3, "batch aborted");
        });

        let lines = buf.lines();
        assert_eq!(lines.len(), 2, "debug events must be filtered: {lines:?}");
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("campaign enqueued"));
        assert!(lines[1].contains("WARN"));
        assert!(lines[1].contains("batch aborted"));
        assert!(lines[1].contains("targets=3"));
    }
}
