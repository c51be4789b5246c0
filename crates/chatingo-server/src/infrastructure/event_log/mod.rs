//! Append-only event log.
//!
//! [`FileEventLog`] is the production sink: `record` only enqueues, and a
//! single writer task owns the file and appends one line per event:
//!
//! ```text
//! [05/03/2024 at 09:07:02] alice is connected.
//! [05/03/2024 at 09:07:09] (alice) Hello!
//! [05/03/2024 at 09:08:30] alice is disconnected.
//! ```
//!
//! Because only the writer task touches the file, concurrent sessions can
//! never interleave partial lines.  Logging is best-effort: a full queue
//! drops the event, and open/write failures are reported through `tracing`
//! without ever reaching the session that produced the event.

pub mod memory;

pub use memory::MemoryEventLog;

use std::io;
use std::path::{Path, PathBuf};

use chatingo_core::LogEvent;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::application::EventSink;

/// Events buffered between the sessions and the writer task.
const QUEUE_CAPACITY: usize = 1024;

/// Handle to the file-backed event log.  Clones share one writer task.
#[derive(Clone)]
pub struct FileEventLog {
    tx: mpsc::Sender<LogEvent>,
}

impl FileEventLog {
    /// Starts the writer task for `path`.
    ///
    /// The file is opened lazily on the first event, so a bad path is
    /// reported then rather than failing startup.  The returned handle
    /// completes once every `FileEventLog` clone has been dropped and the
    /// queue is drained.
    pub fn spawn(path: impl Into<PathBuf>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(write_events(path.into(), rx));
        (Self { tx }, handle)
    }
}

impl EventSink for FileEventLog {
    fn record(&self, event: LogEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("event log queue full; dropping: {event}");
            }
            Err(TrySendError::Closed(event)) => {
                error!("event log writer has stopped; dropping: {event}");
            }
        }
    }
}

async fn write_events(path: PathBuf, mut rx: mpsc::Receiver<LogEvent>) {
    let mut file: Option<File> = None;

    while let Some(event) = rx.recv().await {
        if file.is_none() {
            match open_append(&path).await {
                Ok(f) => file = Some(f),
                Err(e) => {
                    error!("cannot open event log {}: {e}", path.display());
                    continue;
                }
            }
        }

        if let Some(f) = file.as_mut() {
            if let Err(e) = append(f, &event).await {
                error!("cannot write event log {}: {e}", path.display());
                // Reopen on the next event.
                file = None;
            }
        }
    }

    debug!("event log writer for {} stopped", path.display());
}

async fn open_append(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

async fn append(file: &mut File, event: &LogEvent) -> io::Result<()> {
    file.write_all(event.to_line().as_bytes()).await?;
    file.flush().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
