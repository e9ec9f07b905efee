//! StatusHub Core - Client Library for StatusHub Servers
//!
//! This crate talks to a StatusHub server: it posts and reads service log
//! entries over the HTTP API, and keeps a live, deduplicated copy of a
//! service's log by merging API snapshots with entries pushed over a
//! WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         StreamSession                            │
//! │                 (at most one stream at a time)                   │
//! └────────────────────────────────┬─────────────────────────────────┘
//!                                  │
//! ┌────────────────────────────────┼─────────────────────────────────┐
//! │                         LiveLogStream                            │
//! │  ┌──────────────┐    ┌────────┴───────┐    ┌──────────────────┐  │
//! │  │ LogTransport │───►│  LogReconciler │───►│   LogObserver    │  │
//! │  │ (WebSocket / │    │ dedup, order,  │    │ on_change /      │  │
//! │  │  in-process) │    │ limit, refresh │    │ on_error         │  │
//! │  └──────────────┘    └────────▲───────┘    └──────────────────┘  │
//! │                               │                                  │
//! │                      ┌────────┴────────┐                         │
//! │                      │ SnapshotFetcher │                         │
//! │                      │   (HubClient)   │                         │
//! │                      └─────────────────┘                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`HubClient`]: HTTP API client (login, add, logs, media, delete)
//! - [`LiveLogStream`]: Live view of one service's log, or of all logs
//! - [`StreamSession`]: Follows one stream at a time
//! - [`LogEntry`]: One log message
//! - [`HubConfig`]: Server URL, password and timeouts
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use statushub_core::{load_config, ChannelObserver, HubClient, StreamSession, StreamUpdate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     statushub_core::logging::init_tracing();
//!
//!     let config = load_config()?;
//!     let client = HubClient::authenticate(&config).await?;
//!     client.add("nightly-build", "started").await?;
//!
//!     let mut session = StreamSession::from_client(client);
//!     let (observer, mut updates) = ChannelObserver::new();
//!     session.start_streaming("nightly-build", Arc::new(observer));
//!
//!     while let Some(StreamUpdate::Changed(log)) = updates.recv().await {
//!         println!("{} entries, newest: {:?}", log.len(), log.first());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`api`]: HTTP API client and response envelope
//! - [`config`]: Configuration file and environment overrides
//! - [`logging`]: Tracing subscriber setup
//! - [`model`]: Log entries, ids and resources
//! - [`session`]: Single streaming slot
//! - [`snapshot`]: Snapshot fetcher abstraction
//! - [`streaming`]: Live log reconciliation
//! - [`transport`]: Live channel transports (WebSocket, in-process)

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod logging;
pub mod model;
pub mod session;
pub mod snapshot;
pub mod streaming;
pub mod transport;

// Re-exports for convenience
pub use api::{ApiError, HubClient};
pub use model::{parse_event_payload, EntryId, LogEntry, LogResource, MediaRecord};
pub use session::StreamSession;
pub use snapshot::SnapshotFetcher;

// Streaming exports
pub use streaming::{
    ChannelObserver, LiveLogStream, LogObserver, NoopObserver, StreamError, StreamState,
    StreamUpdate,
};

// Transport exports
pub use transport::{
    LogTransport, MemoryConnection, MemoryTransport, MemoryTransportHandle, TransportChannel,
    TransportError, TransportEvent,
};
#[cfg(feature = "websocket")]
pub use transport::WebSocketTransport;

// Config exports
pub use config::{default_config_path, load_config, load_config_from_path, ConfigError, HubConfig};
