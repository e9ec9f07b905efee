//! Transport Traits
//!
//! A transport opens a live channel for one [`LogResource`]. The channel
//! reports `Opened` once, then any number of `Message`s, then at most one
//! `Closed`. Dropping the event receiver or closing the [`ChannelCloser`]
//! tears the connection down.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::model::LogResource;

/// Transport errors
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The stream URL could not be built
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The connection or handshake failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The handshake did not finish in time
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// The other end of the channel is gone
    #[error("channel closed")]
    ChannelClosed,
}

/// Something that happened on a live channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The channel is ready; messages may follow
    Opened,
    /// One message from the server (JSON text)
    Message(String),
    /// The channel closed or failed to open
    Closed {
        /// Why, if known
        reason: Option<String>,
    },
}

/// Closes one live channel
///
/// Dropping a closer without calling [`ChannelCloser::close`] also closes
/// the channel.
#[derive(Debug)]
pub struct ChannelCloser {
    tx: Option<oneshot::Sender<()>>,
}

impl ChannelCloser {
    /// Create a closer and the signal the transport side listens on
    #[must_use]
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Ask the transport to close the channel
    pub fn close(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// An open (or opening) live channel
#[derive(Debug)]
pub struct TransportChannel {
    events: mpsc::Receiver<TransportEvent>,
    closer: ChannelCloser,
}

impl TransportChannel {
    /// Wrap an event receiver and its closer
    #[must_use]
    pub fn new(events: mpsc::Receiver<TransportEvent>, closer: ChannelCloser) -> Self {
        Self { events, closer }
    }

    /// Next event; None once the transport side is gone
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Separate the event receiver from the closer
    #[must_use]
    pub fn split(self) -> (mpsc::Receiver<TransportEvent>, ChannelCloser) {
        (self.events, self.closer)
    }

    /// Close the channel
    pub fn close(self) {
        self.closer.close();
    }
}

/// Opens live channels
pub trait LogTransport: Send + Sync {
    /// Start opening a channel for `resource`
    ///
    /// Never blocks. Connection failures are reported on the returned
    /// channel as [`TransportEvent::Closed`].
    fn open(&self, resource: &LogResource) -> TransportChannel;
}
