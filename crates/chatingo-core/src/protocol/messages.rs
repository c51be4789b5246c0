//! The fixed vocabulary of frames the server sends to its peers.
//!
//! Peers send only raw text (a candidate name, then chat lines), so there is
//! no client-side message type.  Everything the server says, on the other
//! hand, is one of the variants of [`ServerMessage`].
//!
//! | Variant                | Wire text                                        |
//! |------------------------|--------------------------------------------------|
//! | `UsernameAlreadyInUse` | `UsernameAlreadyInUse`                           |
//! | `InvalidUsername`      | `InvalidUsername`                                |
//! | `UsernameAccepted`     | `Your username : <name>`                         |
//! | `Joined`               | `***Here is a new friend. Welcome <name>!***`    |
//! | `Left`                 | `<name> is disconnected. Goodbye!`               |
//! | `Chat`                 | `(<name>) <text>`                                |

use std::fmt;

const ALREADY_IN_USE: &str = "UsernameAlreadyInUse";
const INVALID: &str = "InvalidUsername";
const ACCEPTED_PREFIX: &str = "Your username : ";
const JOINED_PREFIX: &str = "***Here is a new friend. Welcome ";
const JOINED_SUFFIX: &str = "!***";
const LEFT_SUFFIX: &str = " is disconnected. Goodbye!";

/// A frame sent from the server to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// The proposed name is held by another session; the peer should retry.
    UsernameAlreadyInUse,
    /// The proposed name is empty or too long; the peer should retry.
    InvalidUsername,
    /// The proposed name was claimed by this peer.
    UsernameAccepted { name: String },
    /// Another peer finished negotiating and joined the chat.
    Joined { name: String },
    /// Another peer's connection ended.
    Left { name: String },
    /// A chat line relayed from another peer.
    Chat { from: String, text: String },
}

impl ServerMessage {
    /// Returns the wire representation including the `\n` terminator.
    pub fn to_frame(&self) -> String {
        format!("{self}\n")
    }

    /// Interprets one received frame (already stripped of its terminator).
    ///
    /// Returns `None` for text that is not server vocabulary.  Chat lines
    /// are recognised by their `(<name>) ` prefix before departures are
    /// checked, so a relayed line ending in ` is disconnected. Goodbye!`
    /// still parses as chat.
    pub fn parse(frame: &str) -> Option<Self> {
        if frame == ALREADY_IN_USE {
            return Some(Self::UsernameAlreadyInUse);
        }
        if frame == INVALID {
            return Some(Self::InvalidUsername);
        }
        if let Some(name) = frame.strip_prefix(ACCEPTED_PREFIX) {
            return Some(Self::UsernameAccepted {
                name: name.to_string(),
            });
        }
        if let Some(name) = frame
            .strip_prefix(JOINED_PREFIX)
            .and_then(|rest| rest.strip_suffix(JOINED_SUFFIX))
        {
            return Some(Self::Joined {
                name: name.to_string(),
            });
        }
        if let Some((from, text)) = frame
            .strip_prefix('(')
            .and_then(|rest| rest.split_once(") "))
        {
            return Some(Self::Chat {
                from: from.to_string(),
                text: text.to_string(),
            });
        }
        if let Some(name) = frame.strip_suffix(LEFT_SUFFIX) {
            return Some(Self::Left {
                name: name.to_string(),
            });
        }
        None
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernameAlreadyInUse => f.write_str(ALREADY_IN_USE),
            Self::InvalidUsername => f.write_str(INVALID),
            Self::UsernameAccepted { name } => write!(f, "{ACCEPTED_PREFIX}{name}"),
            Self::Joined { name } => write!(f, "{JOINED_PREFIX}{name}{JOINED_SUFFIX}"),
            Self::Left { name } => write!(f, "{name}{LEFT_SUFFIX}"),
            Self::Chat { from, text } => write!(f, "({from}) {text}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
