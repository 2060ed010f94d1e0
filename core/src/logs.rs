use arbihawk_markets::Domain;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

tokio::task_local! {
    /// Domain tag for whichever task body is currently running on this
    /// task (§4.8 `current_domain`). Scoped around a task's body for the
    /// duration of its run so [`RingBufferLayer`] can tag its log lines;
    /// unset outside any task.
    pub static CURRENT_DOMAIN: Domain;
}

/// One ring-buffer entry (§4.8 `logs`).
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub domain: Option<Domain>,
}

/// Bounded ring buffer of the most recent log entries (§4.8: "≥1000
/// entries"), read by the out-of-scope dashboard.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self { capacity, entries: Mutex::new(VecDeque::with_capacity(capacity)) })
    }

    fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// A snapshot copy of the buffer's current contents, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

fn level_str(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warning",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        Level::TRACE => "trace",
    }
}

/// `tracing::Layer` feeding every event into a [`LogBuffer`], tagging it
/// with [`CURRENT_DOMAIN`] when the emitting task has one scoped.
pub struct RingBufferLayer {
    buffer: Arc<LogBuffer>,
}

impl RingBufferLayer {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for RingBufferLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);

        let domain = CURRENT_DOMAIN.try_with(|d| *d).ok();
        self.buffer.push(LogEntry {
            timestamp: Utc::now(),
            level: level_str(event.metadata().level()).to_string(),
            message: visitor.0,
            domain,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest_once_full() {
        let buffer = LogBuffer::new(2);
        for i in 0..3 {
            buffer.push(LogEntry {
                timestamp: Utc::now(),
                level: "info".into(),
                message: format!("line {i}"),
                domain: None,
            });
        }
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].message, "line 1");
        assert_eq!(snapshot[1].message, "line 2");
    }
}
