//! Username negotiation.
//!
//! The user is prompted until the server confirms a name.  Names that break
//! the local rules are rejected without a round trip; the server still has
//! the final word, and its `UsernameAlreadyInUse` or `InvalidUsername`
//! replies send the user back to the prompt.

use chatingo_core::{read_frame, FrameError, ServerMessage, Username};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::ClientError;
use crate::infrastructure::connection::ServerConnection;

pub const PROMPT: &str = "Enter your username : ";

/// Prompts on `output`, reads candidates from `input` and proposes them to
/// the server until one is accepted.  Returns the confirmed name.
///
/// # Errors
///
/// Returns [`ClientError::InputClosed`] if `input` ends first,
/// [`ClientError::ServerClosed`] if the server hangs up, and
/// [`ClientError::UnexpectedReply`] for a reply outside the negotiation
/// vocabulary.
pub async fn negotiate_username<I, O, R, W>(
    input: &mut I,
    output: &mut O,
    connection: &mut ServerConnection<R, W>,
    max_username_length: usize,
) -> Result<String, ClientError>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        print(output, PROMPT).await?;

        let candidate = match read_frame(input).await {
            Ok(line) => line,
            Err(FrameError::Closed) => return Err(ClientError::InputClosed),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = Username::parse_with_limit(&candidate, max_username_length) {
            debug!("username rejected locally: {e}");
            print(output, &not_conform(max_username_length)).await?;
            continue;
        }

        connection.send_line(&candidate).await?;
        let reply = match connection.recv().await {
            Ok(reply) => reply,
            Err(FrameError::Closed) => return Err(ClientError::ServerClosed),
            Err(e) => return Err(e.into()),
        };

        match ServerMessage::parse(&reply) {
            Some(ServerMessage::UsernameAccepted { name }) => {
                print(
                    output,
                    &format!("Welcome {name}. Start chatting by typing a message like \"Hello!\"\n"),
                )
                .await?;
                return Ok(name);
            }
            Some(ServerMessage::UsernameAlreadyInUse) => {
                print(output, "This username is already taken.\n").await?;
            }
            Some(ServerMessage::InvalidUsername) => {
                print(output, &not_conform(max_username_length)).await?;
            }
            _ => return Err(ClientError::UnexpectedReply(reply)),
        }
    }
}

fn not_conform(max_username_length: usize) -> String {
    format!("The username you took isn't conform:\n  - Max length: {max_username_length}\n\n")
}

async fn print<O>(output: &mut O, text: &str) -> Result<(), ClientError>
where
    O: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
