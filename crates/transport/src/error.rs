//! Error types for the wire layer.

use std::io;

use bytes::Bytes;

/// Errors raised while framing or unframing protocol messages.
///
/// Variants carrying `raw` bytes are produced when the length prefix could not
/// be trusted: the decoder gives up on the buffered input and hands it back for
/// diagnostics. The remaining variants only discard the offending frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The header section contained invalid UTF-8.
    #[error("invalid UTF-8 in header")]
    InvalidUtf8 { raw: Bytes },

    /// No Content-Length header was found in the header section.
    #[error("missing Content-Length header")]
    MissingContentLength { raw: Bytes },

    /// The Content-Length header value could not be parsed as an integer.
    #[error("malformed Content-Length header value")]
    MalformedContentLength { raw: Bytes },

    /// The message body exceeds the configured maximum size.
    #[error("message size {size} exceeds maximum allowed {max}")]
    MessageTooLarge {
        /// The announced message size.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },

    /// The payload was not a valid protocol message.
    #[error("invalid message payload: {source}")]
    InvalidPayload {
        #[source]
        source: serde_json::Error,
        payload: Bytes,
    },

    /// Failed to serialize an outgoing message.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl FrameError {
    /// Bytes surrendered by the decoder alongside this error, if any.
    pub fn raw(&self) -> Option<&[u8]> {
        match self {
            FrameError::InvalidUtf8 { raw }
            | FrameError::MissingContentLength { raw }
            | FrameError::MalformedContentLength { raw } => Some(raw),
            FrameError::InvalidPayload { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Whether decoding can continue past this error without losing
    /// synchronisation with the frame boundaries.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidPayload { .. } | FrameError::MessageTooLarge { .. }
        )
    }
}

/// Errors raised by a [`Transport`](crate::io::Transport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("connecting to debug adapter at {address}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("transport refused connection")]
    Refused,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("transport closed")]
    Closed,
}
