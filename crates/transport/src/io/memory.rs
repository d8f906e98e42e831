//! In-memory transport implementation for testing

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};

use super::{Transport, TransportEvent};
use crate::codec;
use crate::decoder::FrameDecoder;
use crate::error::TransportError;
use crate::message::Message;

/// In-memory transport for testing
///
/// This transport uses channels for bidirectional communication without
/// requiring actual network connections. The [`MemoryPeer`] half plays the
/// debug adapter: it sees every frame the client sends and injects reads
/// (whole frames, fragments, or raw garbage) on the client side.
///
/// # Examples
///
/// ```
/// use transport::io::{MemoryTransport, Transport, TransportEvent};
///
/// let (mut transport, mut peer) = MemoryTransport::pair();
/// let events = transport.connect()?;
///
/// transport.send(b"hello")?;
/// assert_eq!(peer.received_bytes(), b"hello");
///
/// peer.send_raw(b"world");
/// assert!(matches!(events.try_recv(), Ok(TransportEvent::Data(_))));
/// # Ok::<(), transport::TransportError>(())
/// ```
pub struct MemoryTransport {
    inbound: Receiver<TransportEvent>,
    outbound: Sender<Bytes>,
    connected: bool,
    refuse: bool,
    close_tx: Sender<TransportEvent>,
    attached: Arc<AtomicBool>,
}

/// The adapter side of a [`MemoryTransport`].
pub struct MemoryPeer {
    to_client: Sender<TransportEvent>,
    from_client: Receiver<Bytes>,
    decoder: FrameDecoder,
    attached: Arc<AtomicBool>,
}

impl MemoryTransport {
    /// Create a connected pair of transport and peer.
    pub fn pair() -> (Self, MemoryPeer) {
        let (to_client, inbound) = crossbeam_channel::unbounded();
        let (outbound, from_client) = crossbeam_channel::unbounded();
        let attached = Arc::new(AtomicBool::new(false));

        let transport = Self {
            inbound,
            outbound,
            connected: false,
            refuse: false,
            close_tx: to_client.clone(),
            attached: Arc::clone(&attached),
        };
        let peer = MemoryPeer {
            to_client,
            from_client,
            decoder: FrameDecoder::new(),
            attached,
        };
        (transport, peer)
    }

    /// A pair whose transport fails every connection attempt.
    pub fn refusing() -> (Self, MemoryPeer) {
        let (mut transport, peer) = Self::pair();
        transport.refuse = true;
        (transport, peer)
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> Result<Receiver<TransportEvent>, TransportError> {
        if self.refuse {
            return Err(TransportError::Refused);
        }
        // a close from the previous connection may still be queued
        let stale = self.inbound.try_iter().count();
        if stale > 0 {
            tracing::debug!(stale, "discarding reads from previous connection");
        }
        self.connected = true;
        self.attached.store(true, Ordering::SeqCst);
        Ok(self.inbound.clone())
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.outbound
            .send(Bytes::copy_from_slice(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if self.connected {
            self.connected = false;
            self.attached.store(false, Ordering::SeqCst);
            let _ = self.close_tx.send(TransportEvent::Closed);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl MemoryPeer {
    /// Whether the client side is connected and reading.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Deliver a message to the client as a single read.
    pub fn send(&self, message: &Message) {
        match codec::encode(message) {
            Ok(frame) => self.send_raw(&frame),
            Err(e) => tracing::error!(error = %e, "encoding peer message"),
        }
    }

    /// Deliver several messages to the client in one read.
    pub fn send_batch(&self, messages: &[Message]) {
        let mut bytes = Vec::new();
        for message in messages {
            match codec::encode(message) {
                Ok(frame) => bytes.extend_from_slice(&frame),
                Err(e) => tracing::error!(error = %e, "encoding peer message"),
            }
        }
        self.send_raw(&bytes);
    }

    /// Deliver arbitrary bytes to the client as a single read.
    pub fn send_raw(&self, bytes: &[u8]) {
        let _ = self
            .to_client
            .send(TransportEvent::Data(Bytes::copy_from_slice(bytes)));
    }

    /// Simulate the adapter hanging up.
    pub fn hang_up(&self) {
        let _ = self.to_client.send(TransportEvent::Closed);
    }

    /// Raw bytes sent by the client since the last call.
    pub fn received_bytes(&mut self) -> Vec<u8> {
        self.from_client
            .try_iter()
            .flat_map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Messages sent by the client since the last call.
    pub fn received(&mut self) -> Vec<Message> {
        let chunks: Vec<Bytes> = self.from_client.try_iter().collect();
        let mut messages = Vec::new();
        for chunk in chunks {
            let pass = self.decoder.decode(&chunk);
            messages.extend(pass.messages);
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Event, Request};

    #[test]
    fn client_frames_reach_peer() -> Result<(), TransportError> {
        let (mut transport, mut peer) = MemoryTransport::pair();
        let _events = transport.connect()?;

        let request = Message::Request(Request {
            seq: 1,
            command: "initialize".to_string(),
            arguments: None,
        });
        transport.send(&codec::encode(&request).map_err(|_| TransportError::Closed)?)?;

        assert_eq!(peer.received(), vec![request]);
        assert!(peer.received().is_empty());
        Ok(())
    }

    #[test]
    fn peer_messages_arrive_as_reads() -> Result<(), TransportError> {
        let (mut transport, peer) = MemoryTransport::pair();
        let events = transport.connect()?;

        peer.send(&Message::Event(Event {
            seq: 1,
            event: "initialized".to_string(),
            body: None,
        }));
        peer.hang_up();

        assert!(matches!(events.try_recv(), Ok(TransportEvent::Data(_))));
        assert_eq!(events.try_recv(), Ok(TransportEvent::Closed));
        Ok(())
    }

    #[test]
    fn send_before_connect_fails() {
        let (mut transport, _peer) = MemoryTransport::pair();
        assert!(matches!(
            transport.send(b"x"),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn refusing_transport_reports_failure() {
        let (mut transport, peer) = MemoryTransport::refusing();
        assert!(matches!(transport.connect(), Err(TransportError::Refused)));
        assert!(!peer.is_attached());
    }

    #[test]
    fn close_emits_closed_once() -> Result<(), TransportError> {
        let (mut transport, _peer) = MemoryTransport::pair();
        let events = transport.connect()?;
        transport.close();
        transport.close();

        assert_eq!(events.try_recv(), Ok(TransportEvent::Closed));
        assert!(events.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn peer_tracks_attachment() -> Result<(), TransportError> {
        let (mut transport, peer) = MemoryTransport::pair();
        assert!(!peer.is_attached());

        let _events = transport.connect()?;
        assert!(peer.is_attached());

        transport.close();
        assert!(!peer.is_attached());

        let _events = transport.connect()?;
        assert!(peer.is_attached());
        Ok(())
    }
}
