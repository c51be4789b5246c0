//! Newline-delimited text framing over any tokio byte stream.
//!
//! Wire format:
//! ```text
//! <utf-8 text>\n        or        <utf-8 text>\r\n
//! ```
//! A frame is everything up to and including the next `\n`.  The terminator
//! (and one `\r` directly before it) is stripped on read.  Writes are
//! verbatim: the caller appends the terminator.
//!
//! TCP is a *stream* protocol, so a single `read()` may deliver half a line
//! or several lines at once.  Reading through an [`AsyncBufRead`] lets the
//! buffer carry leftover bytes between calls, so every call to
//! [`read_frame`] yields exactly one line.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use thiserror::Error;

/// Upper bound on the size of one frame, terminator included.
pub const MAX_FRAME_LEN: usize = 4096;

/// Errors that can occur while reading or writing frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream cleanly between two frames.
    #[error("connection closed by peer")]
    Closed,

    /// The stream ended in the middle of a line.
    #[error("connection closed mid-frame after {partial} byte(s)")]
    UnexpectedEof { partial: usize },

    /// A line exceeded [`MAX_FRAME_LEN`] bytes without a terminator.
    #[error("frame exceeds {limit} bytes")]
    TooLong { limit: usize },

    /// The underlying transport failed.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Returns `true` when the peer simply hung up between frames.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, FrameError::Closed)
    }
}

/// Reads one frame from `reader` and returns it without its line terminator.
///
/// Blocks (asynchronously) until a full line is buffered, the stream ends, or
/// the transport fails.  Invalid UTF-8 is replaced with `U+FFFD` rather than
/// rejected.
///
/// # Errors
///
/// - [`FrameError::Closed`] when the stream ends before any byte of a new frame.
/// - [`FrameError::UnexpectedEof`] when the stream ends inside a frame.
/// - [`FrameError::TooLong`] when no terminator appears within [`MAX_FRAME_LEN`] bytes.
/// - [`FrameError::Io`] for transport failures.
///
/// # Examples
///
/// ```rust
/// use chatingo_core::protocol::read_frame;
///
/// # tokio_test::block_on(async {
/// let mut input: &[u8] = b"alice\r\nHello!\n";
/// assert_eq!(read_frame(&mut input).await.unwrap(), "alice");
/// assert_eq!(read_frame(&mut input).await.unwrap(), "Hello!");
/// assert!(read_frame(&mut input).await.unwrap_err().is_clean_close());
/// # });
/// ```
pub async fn read_frame<R>(reader: &mut R) -> Result<String, FrameError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut buf = Vec::with_capacity(128);

    // `take` caps how much a single hostile line can make us buffer.
    let n = reader
        .take(MAX_FRAME_LEN as u64)
        .read_until(b'\n', &mut buf)
        .await?;

    if n == 0 {
        return Err(FrameError::Closed);
    }

    if buf.last() != Some(&b'\n') {
        if n >= MAX_FRAME_LEN {
            return Err(FrameError::TooLong {
                limit: MAX_FRAME_LEN,
            });
        }
        return Err(FrameError::UnexpectedEof { partial: n });
    }

    // Separated in two steps to handle both `\n` and `\r\n` line endings.
    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Writes `text` to `writer` exactly as given and flushes it.
///
/// # Errors
///
/// Returns [`FrameError::Io`] if the write or the flush fails (e.g., the peer
/// reset the connection).
pub async fn write_frame<W>(writer: &mut W, text: &str) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
