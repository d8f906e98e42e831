//! TCP-based transport implementation

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use retry::{delay::Exponential, retry};

use super::{Transport, TransportEvent};
use crate::error::TransportError;

const READ_CHUNK_SIZE: usize = 8 * 1024;

fn retry_scale() -> impl Iterator<Item = Duration> {
    Exponential::from_millis(200).take(5)
}

/// TCP-based transport
///
/// Connecting retries with exponential back-off (200ms, 400ms, 800ms,
/// 1600ms, 3200ms), since adapters often take a moment to start listening.
/// Reads happen on a background thread which forwards every chunk it
/// receives and finishes with [`TransportEvent::Closed`].
///
/// # Examples
///
/// ```no_run
/// use transport::io::{TcpTransport, Transport};
///
/// let mut transport = TcpTransport::new("127.0.0.1:5678");
/// let events = transport.connect()?;
/// transport.send(b"Content-Length: 2\r\n\r\n{}")?;
/// # Ok::<(), transport::TransportError>(())
/// ```
pub struct TcpTransport {
    address: String,
    stream: Option<TcpStream>,
    reader: Option<JoinHandle<()>>,
}

impl TcpTransport {
    /// Create an unconnected transport for the given `host:port` address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream: None,
            reader: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Transport for TcpTransport {
    #[tracing::instrument(skip(self), fields(address = %self.address))]
    fn connect(&mut self) -> Result<Receiver<TransportEvent>, TransportError> {
        if self.stream.is_some() {
            tracing::debug!("already connected, reconnecting");
            self.close();
        }

        let address = self.address.clone();
        let stream = retry(retry_scale(), || {
            tracing::debug!("trying to make connection");
            match TcpStream::connect(&address) {
                Ok(stream) => {
                    tracing::debug!("connection made");
                    Ok(stream)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "error making connection");
                    Err(e)
                }
            }
        })
        .map_err(|e| TransportError::Connect {
            address: address.clone(),
            source: e.error,
        })?;

        let input = stream.try_clone()?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let reader = thread::Builder::new()
            .name("dap-reader".to_string())
            .spawn(move || read_loop(input, tx))?;

        self.stream = Some(stream);
        self.reader = Some(reader);
        Ok(rx)
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write_all(frame)?;
        stream.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::debug!("shutting down tcp transport");
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!(error = %e, "shutting down stream");
            }
        }
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::warn!("reader thread panicked");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_loop(mut input: TcpStream, events: Sender<TransportEvent>) {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match input.read(&mut buf) {
            Ok(0) => {
                tracing::debug!("adapter closed the connection");
                break;
            }
            Ok(n) => {
                tracing::trace!(bytes = n, "read from adapter");
                if events
                    .send(TransportEvent::Data(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    tracing::debug!("event receiver dropped, stopping reader");
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!(error = %e, "error reading from adapter");
                break;
            }
        }
    }
    let _ = events.send(TransportEvent::Closed);
}
