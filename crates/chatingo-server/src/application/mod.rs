//! Application layer of the chat server.
//!
//! Use cases in this layer depend on abstractions rather than sockets:
//!
//! - [`FrameSink`] is how the server writes to a peer.  The infrastructure
//!   layer implements it over a TCP write half; tests implement it with
//!   recording or failing doubles.
//! - [`EventSink`] is where join/leave/message events go.
//!
//! # Sub-modules
//!
//! - **`registry`**  – The single shared name ↔ session directory.
//! - **`broadcast`** – Fan-out of one frame to every other active session.
//! - **`session`**   – The per-connection `Negotiating → Active → Closed`
//!   state machine.

pub mod broadcast;
pub mod registry;
pub mod session;

use async_trait::async_trait;
use chatingo_core::{FrameError, LogEvent};

/// The write side of one peer connection.
///
/// Implementations must serialize concurrent callers so that two frames
/// never interleave on the wire.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Writes one complete frame (terminator included).
    async fn send_frame(&self, frame: &str) -> Result<(), FrameError>;

    /// Closes the write direction of the connection.
    async fn close(&self) -> Result<(), FrameError>;
}

/// Destination for server events.
///
/// `record` must return promptly: persistence happens elsewhere, and a
/// failure to persist is the sink's problem, never the caller's.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn record(&self, event: LogEvent);
}
