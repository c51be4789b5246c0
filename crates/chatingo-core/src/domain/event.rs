//! Timestamped records for the server's append-only event log.
//!
//! One event renders as one line:
//!
//! ```text
//! [05/03/2024 at 09:07:02] alice is connected.
//! ```

use std::fmt;

use chrono::{DateTime, Local};

use super::username::Username;

/// `chrono` format string for the bracketed timestamp.
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y at %H:%M:%S";

/// A single event-log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: DateTime<Local>,
    pub text: String,
}

impl LogEvent {
    /// Creates an event stamped with the current local time.
    pub fn now(text: impl Into<String>) -> Self {
        Self::at(Local::now(), text)
    }

    /// Creates an event with an explicit timestamp.
    pub fn at(timestamp: DateTime<Local>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }

    pub fn joined(name: &Username) -> Self {
        Self::now(format!("{name} is connected."))
    }

    pub fn left(name: &Username) -> Self {
        Self::now(format!("{name} is disconnected."))
    }

    pub fn message(name: &Username, text: &str) -> Self {
        Self::now(format!("({name}) {text}"))
    }

    /// Renders the event as a log line, including the trailing `\n`.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A record is one line; stray terminators in the text would split it.
        let text = self.text.trim_end_matches(['\r', '\n']);
        write!(f, "[{}] {}", self.timestamp.format(TIMESTAMP_FORMAT), text)
    }
}
