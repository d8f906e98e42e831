//! IO abstraction layer for the wire conversation
//!
//! The core trait [`Transport`] hides how bytes reach the debug adapter. It
//! moves raw frames out and reports raw reads back through a channel, so the
//! protocol engine never blocks on a socket and processes reads strictly in
//! arrival order.
//!
//! # Examples
//!
//! ## Using TCP Transport
//!
//! ```no_run
//! use transport::io::{TcpTransport, Transport};
//!
//! let mut transport = TcpTransport::new("127.0.0.1:5678");
//! let events = transport.connect()?;
//! # Ok::<(), transport::TransportError>(())
//! ```
//!
//! ## Using In-Memory Transport for Testing
//!
//! ```
//! use transport::io::{MemoryTransport, Transport};
//!
//! let (mut transport, peer) = MemoryTransport::pair();
//! let events = transport.connect()?;
//! assert!(peer.is_attached());
//! # Ok::<(), transport::TransportError>(())
//! ```

use bytes::Bytes;
use crossbeam_channel::Receiver;

use crate::error::TransportError;

mod memory;
mod tcp;

pub use memory::{MemoryPeer, MemoryTransport};
pub use tcp::TcpTransport;

/// Something observed on the inbound side of a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A raw read. May hold part of a frame, or several frames.
    Data(Bytes),
    /// The transport shut down, either on request or because the peer went away.
    Closed,
}

/// Trait for bidirectional frame transport
///
/// # Requirements
///
/// - `connect` must report failures rather than swallow them
/// - inbound reads must be delivered through the returned channel in the
///   order they were read, followed by a single [`TransportEvent::Closed`]
/// - `send` writes exactly the bytes it is given
pub trait Transport: Send {
    /// Open the transport and return the channel inbound reads arrive on.
    fn connect(&mut self) -> Result<Receiver<TransportEvent>, TransportError>;

    /// Write a complete encoded frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Shut the transport down. Safe to call when not connected.
    fn close(&mut self);

    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<Receiver<TransportEvent>, TransportError> {
        (**self).connect()
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
