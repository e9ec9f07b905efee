//! Stream Session
//!
//! Holds the one live stream a viewer is following. Switching to another
//! resource stops the previous stream first, so at most one live channel is
//! open per session.

use std::sync::Arc;

use crate::model::{LogEntry, LogResource};
use crate::snapshot::SnapshotFetcher;
use crate::streaming::{LiveLogStream, LogObserver};
use crate::transport::LogTransport;

#[cfg(feature = "websocket")]
use crate::api::HubClient;

/// Single streaming slot over a shared transport and fetcher
pub struct StreamSession {
    transport: Arc<dyn LogTransport>,
    fetcher: Arc<dyn SnapshotFetcher>,
    current: Option<LiveLogStream>,
}

impl StreamSession {
    /// Create a session with nothing streaming
    pub fn new(transport: Arc<dyn LogTransport>, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        Self {
            transport,
            fetcher,
            current: None,
        }
    }

    /// Session streaming over WebSocket and fetching through `client`
    #[cfg(feature = "websocket")]
    pub fn from_client(client: HubClient) -> Self {
        let transport = Arc::new(client.stream_transport());
        Self::new(transport, Arc::new(client))
    }

    /// Follow `resource`, replacing whatever was streaming
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_streaming(
        &mut self,
        resource: impl Into<LogResource>,
        observer: Arc<dyn LogObserver>,
    ) -> &LiveLogStream {
        self.stop_streaming();

        let stream = LiveLogStream::new(
            resource,
            Arc::clone(&self.transport),
            Arc::clone(&self.fetcher),
        );
        stream.set_observer(observer);
        stream.start();
        tracing::debug!(resource = %stream.resource(), "Session switched stream");
        self.current.insert(stream)
    }

    /// Stop and forget the current stream, if any
    pub fn stop_streaming(&mut self) {
        if let Some(stream) = self.current.take() {
            stream.stop();
        }
    }

    /// Whether a stream is held and still running
    ///
    /// A stream that failed stays held (its log remains readable) but no
    /// longer counts as streaming.
    pub fn is_streaming(&self) -> bool {
        self.current.as_ref().is_some_and(LiveLogStream::is_running)
    }

    /// Resource of the held stream
    pub fn current_resource(&self) -> Option<&LogResource> {
        self.current.as_ref().map(LiveLogStream::resource)
    }

    /// Log of the held stream, newest first
    pub fn current_log(&self) -> Vec<LogEntry> {
        self.current
            .as_ref()
            .map(LiveLogStream::log)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
