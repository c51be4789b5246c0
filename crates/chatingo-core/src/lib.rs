//! # chatingo-core
//!
//! Shared library for Chatingo containing the line-oriented wire protocol and
//! the small set of domain types both the server and the client agree on.
//!
//! This crate is used by both the server and the client applications.  It
//! has no knowledge of sockets or listeners: the framer works over any tokio
//! `AsyncBufRead` / `AsyncWrite`, so it can be driven by a `TcpStream`, an
//! in-memory duplex pipe, or a scripted mock in tests.
//!
//! # Architecture overview
//!
//! - **`protocol`** – How text travels over the network.  Every frame is one
//!   line terminated by `\n` (a preceding `\r` is tolerated).  The server
//!   speaks a fixed vocabulary of control and announcement frames, modelled
//!   by [`ServerMessage`].
//!
//! - **`domain`** – Pure types with no I/O: the validated [`Username`] and
//!   the timestamped [`LogEvent`] written to the event log.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `chatingo_core::Username` instead of `chatingo_core::domain::username::Username`.
pub use domain::event::LogEvent;
pub use domain::username::{Username, UsernameError, MAX_USERNAME_LENGTH};
pub use protocol::framing::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use protocol::messages::ServerMessage;
