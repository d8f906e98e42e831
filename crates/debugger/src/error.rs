use std::time::Duration;

use transport::Seq;

/// The ways a reply callback can fail instead of receiving its message.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    /// The adapter answered with `success = false`.
    #[error("{command} request rejected: {}", message.as_deref().unwrap_or("no reason given"))]
    Rejected {
        command: String,
        message: Option<String>,
    },

    /// No reply arrived before the deadline.
    #[error("no reply to {command} request {seq} after {after:?}")]
    Timeout {
        seq: Seq,
        command: String,
        after: Duration,
    },

    /// The reply arrived but its body had an unexpected shape.
    #[error("decoding reply body")]
    Body(#[from] serde_json::Error),
}

impl ReplyError {
    /// The command of the request this error belongs to, where known.
    pub fn command(&self) -> Option<&str> {
        match self {
            ReplyError::Rejected { command, .. } | ReplyError::Timeout { command, .. } => {
                Some(command)
            }
            ReplyError::Body(_) => None,
        }
    }
}

/// Errors parsing a key chord such as `ctrl + shift + 66`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcutError {
    #[error("unknown key `{token}` in shortcut `{chord}`")]
    UnknownKey { chord: String, token: String },

    #[error("shortcut `{0}` has no key code")]
    MissingKeyCode(String),

    #[error("shortcut `{0}` has more than one key code")]
    MultipleKeyCodes(String),
}
