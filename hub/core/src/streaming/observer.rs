//! Stream Observers
//!
//! Callbacks a [`LiveLogStream`](super::LiveLogStream) delivers to its owner.
//! They run on a runtime worker while the stream's lock is held: keep them
//! short, never block in them, and feel free to call back into the same
//! stream (`stop()` from `on_change` is fine).

use tokio::sync::mpsc;

use crate::model::LogEntry;

use super::reconcile::StreamError;

/// Receiver of stream notifications
///
/// Both methods default to no-ops.
pub trait LogObserver: Send + Sync {
    /// The visible log changed; `log` is the full log, newest first
    ///
    /// The slice is only valid for the duration of the call.
    fn on_change(&self, log: &[LogEntry]) {
        let _ = log;
    }

    /// The stream failed and has stopped; called at most once
    fn on_error(&self, error: &StreamError) {
        let _ = error;
    }
}

/// Observer that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl LogObserver for NoopObserver {}

/// A notification forwarded by [`ChannelObserver`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamUpdate {
    /// Full log after a change, newest first
    Changed(Vec<LogEntry>),
    /// Terminal failure
    Failed(StreamError),
}

/// Observer that forwards notifications into a tokio channel
///
/// Lets an async task consume a stream with `recv().await` instead of
/// implementing callbacks. Notifications are dropped once the receiver is
/// gone.
#[derive(Clone, Debug)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StreamUpdate>,
}

impl ChannelObserver {
    /// Create an observer and the receiver of its updates
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogObserver for ChannelObserver {
    fn on_change(&self, log: &[LogEntry]) {
        let _ = self.tx.send(StreamUpdate::Changed(log.to_vec()));
    }

    fn on_error(&self, error: &StreamError) {
        let _ = self.tx.send(StreamUpdate::Failed(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_forwards() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.on_change(&[LogEntry::new(1, "svc", "hello")]);
        observer.on_error(&StreamError::TransportClosed { reason: None });

        match rx.try_recv().unwrap() {
            StreamUpdate::Changed(log) => assert_eq!(log.len(), 1),
            other => panic!("Expected Changed, got {other:?}"),
        }
        assert_eq!(
            rx.try_recv().unwrap(),
            StreamUpdate::Failed(StreamError::TransportClosed { reason: None })
        );
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_change(&[]);
    }

    #[test]
    fn test_noop_observer_defaults() {
        let observer = NoopObserver;
        observer.on_change(&[]);
        observer.on_error(&StreamError::DeserializationFailed("x".into()));
    }
}
