//! Infrastructure layer for the chat server.
//!
//! Contains the OS-facing adapters: the TCP listener and connection writer,
//! the append-only event log file, and TOML configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `chatingo_core`, but MUST NOT be imported by the `application` layer.

pub mod event_log;
pub mod network;
pub mod storage;
