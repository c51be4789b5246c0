//! Protocol module containing the line framer and the server message vocabulary.

pub mod framing;
pub mod messages;

pub use framing::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use messages::ServerMessage;
