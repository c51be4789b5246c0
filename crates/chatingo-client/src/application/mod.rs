//! Application layer of the client.
//!
//! - **`negotiate`** – Prompt for a name until the server accepts one.
//! - **`relay`**     – Pump terminal lines to the server and server frames
//!   to the terminal, concurrently.

pub mod negotiate;
pub mod relay;
