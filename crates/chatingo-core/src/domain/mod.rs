//! Domain layer: pure types shared by the server and the client.
//!
//! Nothing in here performs I/O.  [`username::Username`] encodes the naming
//! rules both sides enforce, and [`event::LogEvent`] is the record the server
//! appends to its event log.

pub mod event;
pub mod username;
