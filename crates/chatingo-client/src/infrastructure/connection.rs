//! TCP connection to the chat server.
//!
//! The stream is split into a buffered read half and a write half up front
//! so that the relay can read server frames and write user lines at the
//! same time.

use std::net::SocketAddr;

use chatingo_core::{read_frame, write_frame, FrameError};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ClientError;

/// One connection to the server, as a frame reader plus a frame writer.
pub struct ServerConnection<R, W> {
    pub(crate) reader: R,
    pub(crate) writer: W,
}

impl ServerConnection<BufReader<OwnedReadHalf>, OwnedWriteHalf> {
    /// Opens a TCP connection to the server at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the connection is refused or
    /// unreachable.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect { addr, source })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not disable Nagle: {e}");
        }

        let (read_half, write_half) = stream.into_split();
        Ok(Self::from_parts(BufReader::new(read_half), write_half))
    }
}

impl<R, W> ServerConnection<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn from_parts(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Sends one line of text, appending the `\n` terminator.
    pub async fn send_line(&mut self, text: &str) -> Result<(), FrameError> {
        write_frame(&mut self.writer, &format!("{text}\n")).await
    }

    /// Receives the next frame from the server.
    pub async fn recv(&mut self) -> Result<String, FrameError> {
        read_frame(&mut self.reader).await
    }
}
