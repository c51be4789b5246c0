//! chatingo-client library entry point.
//!
//! The client is deliberately thin: it connects, negotiates a display name
//! on behalf of the user, then copies lines between the terminal and the
//! server until either side ends.
//!
//! # Architecture
//!
//! ```text
//! run()
//!  ├─ ServerConnection::connect     (infrastructure::connection)
//!  ├─ negotiate_username            (application::negotiate)
//!  └─ relay                         (application::relay)
//!       ├─ stdin  ──► socket
//!       └─ socket ──► stdout
//! ```
//!
//! Every step is generic over its reader and writer so tests can drive it
//! with in-memory streams instead of a terminal.

pub mod application;
pub mod error;
pub mod infrastructure;

pub use error::ClientError;

use std::net::SocketAddr;

use tokio::io::{AsyncWriteExt, BufReader};
use tracing::info;

use crate::application::negotiate::negotiate_username;
use crate::application::relay::relay;
use crate::infrastructure::connection::ServerConnection;

/// Runs an interactive session against the server at `addr` using the
/// process's standard input and output.
///
/// # Errors
///
/// Returns [`ClientError::Connect`] if the server is unreachable,
/// [`ClientError::InputClosed`] if standard input ends before a name is
/// accepted, and [`ClientError::ServerClosed`] or a transport error if the
/// server goes away.
pub async fn run(addr: SocketAddr, max_username_length: usize) -> Result<(), ClientError> {
    let mut connection = ServerConnection::connect(addr).await?;
    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();

    output
        .write_all(format!("Connected to {addr}\n").as_bytes())
        .await?;

    let name = negotiate_username(&mut input, &mut output, &mut connection, max_username_length)
        .await?;
    info!("chatting as {name}");

    relay(&mut input, &mut output, &mut connection).await?;

    output.write_all(b"Successfully disconnected.\n").await?;
    output.flush().await?;
    Ok(())
}
