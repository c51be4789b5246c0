//! Infrastructure layer of the client: the TCP connection to the server.

pub mod connection;
