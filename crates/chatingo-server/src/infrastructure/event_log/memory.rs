//! In-memory event sink for tests and embedding.
//!
//! Keeps every recorded [`LogEvent`] so callers can assert on exactly what
//! the server logged, in order.

use std::sync::{Arc, Mutex, PoisonError};

use chatingo_core::LogEvent;

use crate::application::EventSink;

/// An [`EventSink`] that stores events in a shared vector.
#[derive(Clone, Default)]
pub struct MemoryEventLog {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Just the event texts, without timestamps.
    pub fn texts(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.text).collect()
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, event: LogEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_events_in_order() {
        let log = MemoryEventLog::new();
        log.record(LogEvent::now("first"));
        log.record(LogEvent::now("second"));
        assert_eq!(log.texts(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_clones_share_storage() {
        let log = MemoryEventLog::new();
        let clone = log.clone();
        clone.record(LogEvent::now("shared"));
        assert_eq!(log.events().len(), 1);
    }
}
