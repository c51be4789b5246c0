//! Network adapters: the accept loop and the per-connection frame writer.

pub mod connection;
pub mod listener;

pub use connection::ConnectionWriter;
pub use listener::ChatServer;
