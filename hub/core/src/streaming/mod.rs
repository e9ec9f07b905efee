//! Live Log Streaming
//!
//! Keeps a local copy of one resource's log in sync with the server by
//! combining two sources: full snapshots over the HTTP API and individual
//! entries pushed over a live channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        LiveLogStream                         │
//! │                                                              │
//! │  LogTransport ──events──► ┌──────────────┐ ──Changed──► LogObserver
//! │                           │ LogReconciler│ ──Failed───►      │
//! │  SnapshotFetcher ◄─Fetch─ │  (no I/O)    │                   │
//! │        │                  └──────▲───────┘                   │
//! │        └──────snapshot───────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - **No duplicates**: an id appears at most once in the log
//! - **Newest first**: pushed entries are prepended in arrival order
//! - **Bounded**: a `limit` carried by a pushed entry trims the oldest entries
//! - **Stale-safe**: results that arrive after `stop()` are ignored
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use statushub_core::streaming::{ChannelObserver, LiveLogStream, StreamUpdate};
//!
//! let stream = LiveLogStream::new("nightly-build", transport, fetcher);
//! let (observer, mut updates) = ChannelObserver::new();
//! stream.set_observer(Arc::new(observer));
//! stream.start();
//!
//! while let Some(update) = updates.recv().await {
//!     match update {
//!         StreamUpdate::Changed(log) => render(&log),
//!         StreamUpdate::Failed(e) => break,
//!     }
//! }
//! ```

mod live_log;
mod observer;
mod reconcile;

pub use live_log::LiveLogStream;
pub use observer::{ChannelObserver, LogObserver, NoopObserver, StreamUpdate};
pub use reconcile::{Effect, FetchTicket, LogReconciler, StreamError, StreamState, StreamToken};
