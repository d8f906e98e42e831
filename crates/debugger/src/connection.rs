//! The client end of a conversation with a debug adapter
//!
//! A [`Connection`] owns the transport and turns its reads into messages.
//! Each inbound message is processed to completion before the next one:
//!
//! 1. raw message listeners see it,
//! 2. the event dispatcher sees it, unless it is a rejected response or is
//!    claimed by a reply registered without fan-out,
//! 3. pending replies the message completes are invoked.

use std::time::Instant;

use crossbeam_channel::Receiver;
use transport::{
    FrameCodec, FrameDecoder, Message, Request, TransportError,
    io::{Transport, TransportEvent},
};

use crate::dispatcher::{Category, EventDispatcher, Listeners};
use crate::error::ReplyError;
use crate::pending_requests::{PendingReplies, PendingReply};

type CloseListener = Box<dyn FnMut() + Send>;

pub struct Connection<T> {
    transport: T,
    inbound: Option<Receiver<TransportEvent>>,
    open: bool,
    decoder: FrameDecoder,
    pending: PendingReplies,
    dispatcher: EventDispatcher,
    raw: Listeners<(), Message>,
    close_listeners: Vec<CloseListener>,
}

impl<T> Connection<T>
where
    T: Transport,
{
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, FrameCodec::new())
    }

    pub fn with_codec(transport: T, codec: FrameCodec) -> Self {
        Self {
            transport,
            inbound: None,
            open: false,
            decoder: FrameDecoder::with_codec(codec),
            pending: PendingReplies::new(),
            dispatcher: EventDispatcher::new(),
            raw: Listeners::new(),
            close_listeners: Vec::new(),
        }
    }

    /// Connect the transport; a no-op when already connected.
    #[tracing::instrument(skip(self))]
    pub fn connect(&mut self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }
        let inbound = self.transport.connect().inspect_err(|e| {
            tracing::error!(error = %e, "connecting to debug adapter");
        })?;
        self.decoder.reset();
        self.inbound = Some(inbound);
        self.open = true;
        tracing::debug!("connected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.open && self.transport.is_connected()
    }

    /// Close the transport. Outstanding replies are dropped without being
    /// invoked.
    pub fn close(&mut self) {
        self.transport.close();
        self.shutdown();
    }

    /// Register a listener for the end of the connection, called once each
    /// time an open connection closes.
    pub fn on_close(&mut self, listener: impl FnMut() + Send + 'static) {
        self.close_listeners.push(Box::new(listener));
    }

    /// Register a listener for every decoded inbound message.
    pub fn on_message(
        &mut self,
        listener: impl FnMut(&Message) -> eyre::Result<()> + Send + 'static,
    ) {
        self.raw.on((), listener);
    }

    pub fn events(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    /// Reads from the transport, available while connected.
    pub fn inbound(&self) -> Option<Receiver<TransportEvent>> {
        self.inbound.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a request, tracking `reply` until it completes.
    ///
    /// Returns false, dropping `reply`, if the request could not be sent.
    pub fn send(&mut self, request: Request, reply: Option<PendingReply>) -> bool {
        let seq = request.seq;
        let command = request.command.clone();
        if !self.is_connected() {
            tracing::warn!(seq, %command, "not connected, dropping request");
            return false;
        }

        let frame = match transport::encode(&Message::Request(request)) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(seq, %command, error = %e, "encoding request");
                return false;
            }
        };
        if let Err(e) = self.transport.send(&frame) {
            tracing::error!(seq, %command, error = %e, "sending request");
            return false;
        }
        tracing::debug!(seq, %command, "sent request");

        if let Some(reply) = reply {
            self.pending.insert(seq, &command, reply, Instant::now());
        }
        true
    }

    /// Handle one event from the transport.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Data(chunk) => self.ingest(&chunk),
            TransportEvent::Closed => self.closed_by_peer(),
        }
    }

    /// Decode a transport read and handle every message it completes.
    pub fn ingest(&mut self, chunk: &[u8]) {
        self.feed(chunk);
        while let Some(message) = self.next_message() {
            self.handle_message(message);
        }
    }

    /// Buffer a transport read without handling it yet.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.decoder.feed(chunk);
    }

    /// The next complete message buffered, skipping malformed frames.
    pub fn next_message(&mut self) -> Option<Message> {
        loop {
            match self.decoder.next_message()? {
                Ok(message) => return Some(message),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        recoverable = e.is_recoverable(),
                        "dropping malformed frame"
                    );
                }
            }
        }
    }

    /// Correlate one inbound message and fan it out.
    pub fn handle_message(&mut self, message: Message) {
        match &message {
            Message::Event(e) => tracing::debug!(seq = e.seq, event = %e.event, "received event"),
            Message::Response(r) => tracing::debug!(
                request_seq = r.request_seq,
                command = %r.command,
                success = r.success,
                "received response"
            ),
            Message::Request(r) => {
                tracing::debug!(seq = r.seq, command = %r.command, "ignoring reverse request")
            }
        }
        self.raw.emit(&(), &message);

        let correlation = self.pending.correlate(&message);
        let rejection = match &message {
            Message::Response(r) if !r.success => {
                tracing::warn!(
                    request_seq = r.request_seq,
                    command = %r.command,
                    message = r.message.as_deref().unwrap_or_default(),
                    "request rejected by adapter"
                );
                Some((r.command.clone(), r.message.clone()))
            }
            _ => None,
        };

        if rejection.is_none() {
            match Category::of(&message) {
                Some(category) if correlation.fanout => {
                    self.dispatcher.emit(category, &message);
                }
                Some(_) => tracing::trace!(name = message.name(), "reply claimed without fan-out"),
                None => {}
            }
        }

        for reply in correlation.completed {
            let outcome = match &rejection {
                Some((command, reason)) => Err(ReplyError::Rejected {
                    command: command.clone(),
                    message: reason.clone(),
                }),
                None => Ok(message.clone()),
            };
            reply.complete(outcome);
        }
    }

    /// Fail every reply whose deadline has passed, returning how many did.
    pub fn expire(&mut self, now: Instant) -> usize {
        let expired = self.pending.expire(now);
        let count = expired.len();
        for entry in expired {
            tracing::warn!(seq = entry.seq, command = %entry.command, after = ?entry.after, "reply timed out");
            entry.reply.complete(Err(ReplyError::Timeout {
                seq: entry.seq,
                command: entry.command,
                after: entry.after,
            }));
        }
        count
    }

    /// When the earliest pending reply expires.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.next_deadline()
    }

    pub fn pending_replies(&self) -> usize {
        self.pending.len()
    }

    /// Whether a reply for request `seq` is still outstanding.
    pub fn is_awaiting(&self, seq: transport::Seq) -> bool {
        self.pending.contains(seq)
    }

    /// The adapter hung up, or the read side failed.
    pub fn closed_by_peer(&mut self) {
        tracing::debug!("transport closed by adapter");
        self.transport.close();
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.inbound = None;
        self.decoder.reset();

        let dropped = self.pending.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "dropping pending replies");
        }
        debug_assert!(self.pending.is_empty());

        for listener in &mut self.close_listeners {
            listener();
        }
    }
}
