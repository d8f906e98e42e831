//! Frame codec using tokio-util.
//!
//! This module provides [`FrameCodec`], which implements both the `Encoder`
//! and `Decoder` traits from tokio-util for protocol messages.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;
use crate::message::Message;

/// Default maximum message size (16 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "Content-Length:";

/// Codec for encoding and decoding framed messages.
///
/// Frames use a Content-Length header:
/// ```text
/// Content-Length: <length>\r\n
/// \r\n
/// <JSON body>
/// ```
///
/// Decoding never loses frame alignment silently. A payload that fails to
/// parse is dropped and decoding resumes after it, an oversized payload is
/// skipped as it streams in, and a header whose length cannot be read makes
/// the codec give up the buffered bytes in the returned error.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximum allowed message size in bytes.
    max_message_size: usize,
    /// Bytes of an oversized payload still to be discarded.
    skip_remaining: usize,
}

impl FrameCodec {
    /// Create a new codec with default settings.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a new codec with a custom maximum message size.
    ///
    /// Messages larger than this will be rejected with [`FrameError::MessageTooLarge`].
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            skip_remaining: 0,
        }
    }

    /// The largest payload this codec accepts.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.skip_remaining > 0 {
            let n = self.skip_remaining.min(src.len());
            src.advance(n);
            self.skip_remaining -= n;
            if self.skip_remaining > 0 {
                return Ok(None);
            }
        }

        let Some(header_end) = find_header_end(src) else {
            return Ok(None);
        };

        let content_length = match parse_content_length(&src[..header_end]) {
            Ok(length) => length,
            Err(problem) => {
                let raw = src.split().freeze();
                return Err(problem.into_frame_error(raw));
            }
        };

        let body_start = header_end + HEADER_SEPARATOR.len();

        let total_length = match body_start.checked_add(content_length) {
            Some(total) if content_length <= self.max_message_size => total,
            _ => {
                src.advance(body_start);
                let available = content_length.min(src.len());
                src.advance(available);
                self.skip_remaining = content_length - available;
                return Err(FrameError::MessageTooLarge {
                    size: content_length,
                    max: self.max_message_size,
                });
            }
        };

        if src.len() < total_length {
            src.reserve(total_length - src.len());
            return Ok(None);
        }

        src.advance(body_start);
        let payload = src.split_to(content_length).freeze();
        match serde_json::from_slice(&payload) {
            Ok(message) => Ok(Some(message)),
            Err(source) => Err(FrameError::InvalidPayload { source, payload }),
        }
    }
}

impl Encoder<&Message> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(item).map_err(FrameError::Serialize)?;

        // "Content-Length: " + digits + "\r\n\r\n" + body
        dst.reserve(32 + json.len());
        dst.put_slice(b"Content-Length: ");
        dst.put_slice(json.len().to_string().as_bytes());
        dst.put_slice(HEADER_SEPARATOR);
        dst.put_slice(&json);

        Ok(())
    }
}

/// Encode a single message into a wire frame.
pub fn encode(message: &Message) -> Result<Bytes, FrameError> {
    let mut buf = BytesMut::new();
    FrameCodec::new().encode(message, &mut buf)?;
    Ok(buf.freeze())
}

/// Find the position of the header/body separator (\r\n\r\n).
fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_SEPARATOR.len())
        .position(|w| w == HEADER_SEPARATOR)
}

enum HeaderProblem {
    InvalidUtf8,
    Missing,
    Malformed,
}

impl HeaderProblem {
    fn into_frame_error(self, raw: Bytes) -> FrameError {
        match self {
            HeaderProblem::InvalidUtf8 => FrameError::InvalidUtf8 { raw },
            HeaderProblem::Missing => FrameError::MissingContentLength { raw },
            HeaderProblem::Malformed => FrameError::MalformedContentLength { raw },
        }
    }
}

/// Parse the Content-Length value from the header section.
fn parse_content_length(header: &[u8]) -> Result<usize, HeaderProblem> {
    let header_str = std::str::from_utf8(header).map_err(|_| HeaderProblem::InvalidUtf8)?;

    for line in header_str.split("\r\n") {
        if let Some(value) = line.strip_prefix(CONTENT_LENGTH) {
            return value.trim().parse().map_err(|_| HeaderProblem::Malformed);
        }
    }

    Err(HeaderProblem::Missing)
}
