//! Wire layer for a debug adapter protocol client.
//!
//! This crate handles the transport concerns of talking to a debug adapter:
//!
//! - [`Message`] models requests, responses and events
//! - [`FrameCodec`] implements the tokio-util `Encoder`/`Decoder` pair for the
//!   `Content-Length` framing, and [`FrameDecoder`] accumulates raw reads into
//!   messages
//! - [`RequestBuilder`] stamps requests with per-connection sequence numbers
//! - [`io::Transport`] abstracts the byte stream, with TCP and in-memory
//!   implementations
//!
//! Correlation of responses and events with outstanding requests belongs in
//! the `debugger` crate.

mod codec;
mod decoder;
mod error;
pub mod io;
mod message;
pub mod requests;
pub mod testing;
pub mod types;

pub use codec::{DEFAULT_MAX_MESSAGE_SIZE, FrameCodec, encode};
pub use decoder::{DecodePass, FrameDecoder, Frames};
pub use error::{FrameError, TransportError};
pub use message::{Event, Message, Request, Response, Seq};
pub use requests::{InitializeArguments, RequestBuilder};

/// The default port debug adapters listen on
pub const DEFAULT_DAP_PORT: u16 = 5678;
