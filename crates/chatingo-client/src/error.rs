//! Error type for the client.

use std::io;
use std::net::SocketAddr;

use chatingo_core::FrameError;
use thiserror::Error;

/// Everything that can end a client session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TCP connection could not be established.
    #[error("failed to connect to chat server at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to the server failed.
    #[error("connection to the server failed: {0}")]
    Transport(#[from] FrameError),

    /// Reading from or writing to the terminal failed.
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] io::Error),

    /// The server closed the connection.
    #[error("impossible to get messages from the server; shutting down")]
    ServerClosed,

    /// Standard input ended before a name was accepted.
    #[error("input closed before a username was accepted")]
    InputClosed,

    /// The server answered a name proposal with something unexpected.
    #[error("unexpected reply from server: {0:?}")]
    UnexpectedReply(String),
}
