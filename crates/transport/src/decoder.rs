//! Streaming frame decoder.
//!
//! Transport reads arrive in arbitrary chunks: one read may hold several
//! frames, and a frame may straddle several reads. [`FrameDecoder`]
//! accumulates the chunks and yields messages in arrival order.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::FrameCodec;
use crate::error::FrameError;
use crate::message::Message;

/// Stateful accumulator turning successive transport reads into messages.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    codec: FrameCodec,
    buffer: BytesMut,
}

/// The outcome of decoding everything currently buffered.
#[derive(Debug, Default)]
pub struct DecodePass {
    /// Messages in the order they were framed.
    pub messages: Vec<Message>,
    /// Frames that had to be dropped.
    pub errors: Vec<FrameError>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder around a configured codec.
    pub fn with_codec(codec: FrameCodec) -> Self {
        Self {
            codec,
            buffer: BytesMut::new(),
        }
    }

    /// Append a transport read to the buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Decode the next complete frame, if one is buffered.
    ///
    /// Errors always consume input, so repeatedly calling this drains the
    /// buffer down to an incomplete tail.
    pub fn next_message(&mut self) -> Option<Result<Message, FrameError>> {
        self.codec.decode(&mut self.buffer).transpose()
    }

    /// Iterate over the frames currently buffered.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { decoder: self }
    }

    /// Feed a chunk and decode everything that is now complete.
    pub fn decode(&mut self, chunk: &[u8]) -> DecodePass {
        self.feed(chunk);
        let mut pass = DecodePass::default();
        for frame in self.frames() {
            match frame {
                Ok(message) => pass.messages.push(message),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed frame");
                    pass.errors.push(e);
                }
            }
        }
        pass
    }

    /// Bytes buffered but not yet forming a complete frame.
    pub fn remainder(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard any partially received frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.codec = FrameCodec::with_max_size(self.codec.max_message_size());
    }
}

/// Iterator over buffered frames, see [`FrameDecoder::frames`].
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Result<Message, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_message()
    }
}
