//! The chat phase: two pumps running side by side.
//!
//! - input → server: every line the user types is sent as one frame.
//! - server → output: every frame the server sends is printed as one line.
//!
//! Whichever pump finishes first ends the relay; the other is dropped.  End
//! of input is a normal exit, the server hanging up is not.

use chatingo_core::{read_frame, FrameError};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::ClientError;
use crate::infrastructure::connection::ServerConnection;

/// Runs both pumps until one of them stops.
///
/// # Errors
///
/// Returns [`ClientError::ServerClosed`] when the server ends the
/// connection, and transport or terminal errors as they occur.
pub async fn relay<I, O, R, W>(
    input: &mut I,
    output: &mut O,
    connection: &mut ServerConnection<R, W>,
) -> Result<(), ClientError>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let ServerConnection { reader, writer } = connection;

    tokio::select! {
        result = pump_input(input, writer) => result,
        result = pump_server(reader, output) => result,
    }
}

async fn pump_input<I, W>(input: &mut I, writer: &mut W) -> Result<(), ClientError>
where
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let line = match read_frame(input).await {
            Ok(line) => line,
            Err(FrameError::Closed) => {
                debug!("input closed; ending chat");
                writer.shutdown().await.map_err(FrameError::from)?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        chatingo_core::write_frame(writer, &format!("{line}\n")).await?;
    }
}

async fn pump_server<R, O>(reader: &mut R, output: &mut O) -> Result<(), ClientError>
where
    R: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    loop {
        let frame = match read_frame(reader).await {
            Ok(frame) => frame,
            Err(FrameError::Closed) => return Err(ClientError::ServerClosed),
            Err(e) => return Err(e.into()),
        };
        output.write_all(format!("{frame}\n").as_bytes()).await?;
        output.flush().await?;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
