//! In-Process Transport
//!
//! Channel-backed transport for embedding a log source in the same process,
//! and for driving a stream deterministically in tests. Every `open()`
//! produces a [`MemoryConnection`] on the paired handle; its owner plays the
//! server side.
//!
//! # Usage
//!
//! ```ignore
//! let (transport, mut handle) = MemoryTransport::new_pair();
//!
//! // Give the transport to a LiveLogStream and start it, then:
//! let mut conn = handle.next_connection().await.unwrap();
//! conn.open().await?;
//! conn.send_entry(&LogEntry::new(1, "svc", "hello")).await?;
//! conn.close(Some("server shutting down")).await?;
//! ```

use tokio::sync::{mpsc, oneshot};

use crate::model::{LogEntry, LogResource};

use super::traits::{ChannelCloser, LogTransport, TransportChannel, TransportError, TransportEvent};

/// In-process transport using tokio channels
pub struct MemoryTransport {
    /// Where new connections are announced
    connections: mpsc::UnboundedSender<MemoryConnection>,
    /// Event buffer size per connection
    capacity: usize,
}

/// Receives the server side of every channel opened on a [`MemoryTransport`]
pub struct MemoryTransportHandle {
    connections: mpsc::UnboundedReceiver<MemoryConnection>,
}

impl MemoryTransport {
    /// Create a transport and the handle that receives its connections
    #[must_use]
    pub fn new_pair() -> (Self, MemoryTransportHandle) {
        Self::new_pair_with_capacity(100)
    }

    /// Create with custom per-connection channel capacity
    #[must_use]
    pub fn new_pair_with_capacity(capacity: usize) -> (Self, MemoryTransportHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                connections: tx,
                capacity: capacity.max(1),
            },
            MemoryTransportHandle { connections: rx },
        )
    }
}

impl LogTransport for MemoryTransport {
    fn open(&self, resource: &LogResource) -> TransportChannel {
        let (event_tx, event_rx) = mpsc::channel(self.capacity);
        let (closer, closed_rx) = ChannelCloser::new();

        let connection = MemoryConnection {
            resource: resource.clone(),
            events: event_tx,
            closed: closed_rx,
            closed_seen: false,
        };
        // With no handle left the connection is dropped here, which drops the
        // event sender and reads as a closed channel on the stream side.
        if self.connections.send(connection).is_err() {
            tracing::debug!(%resource, "In-process transport has no server side");
        }

        TransportChannel::new(event_rx, closer)
    }
}

impl MemoryTransportHandle {
    /// Wait for the next channel to be opened
    ///
    /// Returns None once the transport has been dropped.
    pub async fn next_connection(&mut self) -> Option<MemoryConnection> {
        self.connections.recv().await
    }

    /// Take an already-opened channel without waiting
    pub fn try_next_connection(&mut self) -> Option<MemoryConnection> {
        self.connections.try_recv().ok()
    }
}

/// Server side of one in-process channel
pub struct MemoryConnection {
    resource: LogResource,
    events: mpsc::Sender<TransportEvent>,
    closed: oneshot::Receiver<()>,
    closed_seen: bool,
}

impl MemoryConnection {
    /// The resource the channel was opened for
    pub fn resource(&self) -> &LogResource {
        &self.resource
    }

    /// Report the channel as open
    ///
    /// # Errors
    ///
    /// [`TransportError::ChannelClosed`] if the stream side is gone.
    pub async fn open(&self) -> Result<(), TransportError> {
        self.send_event(TransportEvent::Opened).await
    }

    /// Deliver a raw text message
    ///
    /// # Errors
    ///
    /// [`TransportError::ChannelClosed`] if the stream side is gone.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send_event(TransportEvent::Message(text.into())).await
    }

    /// Deliver one entry as a JSON message
    ///
    /// # Errors
    ///
    /// [`TransportError::ChannelClosed`] if the stream side is gone.
    pub async fn send_entry(&self, entry: &LogEntry) -> Result<(), TransportError> {
        self.send_text(encode(entry)?).await
    }

    /// Deliver several entries as one JSON array message
    ///
    /// # Errors
    ///
    /// [`TransportError::ChannelClosed`] if the stream side is gone.
    pub async fn send_batch(&self, entries: &[LogEntry]) -> Result<(), TransportError> {
        self.send_text(encode(entries)?).await
    }

    /// Report the channel as closed by the server
    ///
    /// # Errors
    ///
    /// [`TransportError::ChannelClosed`] if the stream side is gone.
    pub async fn close(self, reason: Option<&str>) -> Result<(), TransportError> {
        self.send_event(TransportEvent::Closed {
            reason: reason.map(str::to_string),
        })
        .await
    }

    /// Whether the stream side has closed (or dropped) its end
    pub fn is_closed(&mut self) -> bool {
        if !self.closed_seen {
            self.closed_seen = !matches!(
                self.closed.try_recv(),
                Err(oneshot::error::TryRecvError::Empty)
            );
        }
        self.closed_seen
    }

    /// Wait until the stream side closes its end
    pub async fn closed(&mut self) {
        if !self.closed_seen {
            let _ = (&mut self.closed).await;
            self.closed_seen = true;
        }
    }

    async fn send_event(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.events
            .send(event)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, TransportError> {
    serde_json::to_string(value).map_err(|e| TransportError::ConnectionFailed(e.to_string()))
}
