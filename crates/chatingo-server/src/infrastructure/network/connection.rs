//! ConnectionWriter: the [`FrameSink`] over the write half of a peer socket.
//!
//! A peer's write half is shared between its own session task (control
//! frames) and every other session task (broadcasts).  The async mutex
//! serializes them so frames never interleave on the wire, and it is
//! `tokio::sync::Mutex` rather than `std` because the lock is held across
//! the `.await` of the write.
//!
//! A write that fails, or whose future is dropped before the frame is fully
//! out (a broadcast timeout), leaves the stream holding part of a frame.
//! From then on the writer is broken: it refuses every further frame and
//! shuts the write half down, so the peer sees a truncated last line and an
//! end of stream instead of two frames spliced together.

use std::io;

use async_trait::async_trait;
use chatingo_core::{write_frame, FrameError};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::application::FrameSink;

struct WriteHalf<W> {
    writer: W,
    /// Set while a frame is in flight; still set afterwards means it was cut off.
    broken: bool,
    shut_down: bool,
}

impl<W> WriteHalf<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn shutdown(&mut self) -> Result<(), FrameError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.writer.shutdown().await?;
        Ok(())
    }
}

pub struct ConnectionWriter<W> {
    inner: Mutex<WriteHalf<W>>,
}

impl<W> ConnectionWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(WriteHalf {
                writer,
                broken: false,
                shut_down: false,
            }),
        }
    }
}

#[async_trait]
impl<W> FrameSink for ConnectionWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_frame(&self, frame: &str) -> Result<(), FrameError> {
        let mut half = self.inner.lock().await;
        if half.broken || half.shut_down {
            // Best-effort: the frame is refused either way.
            let _ = half.shutdown().await;
            return Err(FrameError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection writer is closed",
            )));
        }

        half.broken = true;
        write_frame(&mut half.writer, frame).await?;
        half.broken = false;
        Ok(())
    }

    async fn close(&self) -> Result<(), FrameError> {
        self.inner.lock().await.shutdown().await
    }
}
