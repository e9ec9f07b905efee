//! Log Reconciler
//!
//! The synchronous state machine behind [`LiveLogStream`]. It merges full
//! snapshots with pushed events and tells its driver what to do next through
//! [`Effect`]s; it performs no I/O itself.
//!
//! # Protocol
//!
//! ```text
//!  Stopped ──start──► Connecting ──opened──► Refreshing ──snapshot──► Steady
//!                                             │      ▲                  │
//!                                             └──────┘                  │
//!                                         refresh needed          first message
//!                                                                       │
//!                                             Refreshing ◄──────────────┘
//!
//!  any state ──stop / fatal error──► Stopped (terminal)
//! ```
//!
//! - While a snapshot fetch is outstanding, events are queued.
//! - A refresh requested during a fetch marks the fetch stale; its result is
//!   dropped and a new fetch is issued when it resolves.
//! - After a fetch is applied, queued events are replayed as one batch.
//!
//! Every driver callback carries a [`StreamToken`] (or a [`FetchTicket`]).
//! A token from an earlier generation is stale and its input is ignored.
//!
//! [`LiveLogStream`]: super::LiveLogStream

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::api::ApiError;
use crate::model::{parse_event_payload, EntryId, LogEntry};

/// Fatal stream errors, reported once through `on_error`
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The live channel closed (or never opened) while the stream was running
    #[error("live channel closed{}", closed_suffix(.reason))]
    TransportClosed {
        /// Reason reported by the transport
        reason: Option<String>,
    },

    /// A snapshot fetch failed
    #[error("snapshot fetch failed: {0}")]
    SnapshotFetchFailed(#[from] ApiError),

    /// A pushed message was not a log entry or batch of entries
    #[error("invalid live message: {0}")]
    DeserializationFailed(String),
}

/// Lifecycle state of a stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    /// Not started, or stopped for good
    #[default]
    Stopped,
    /// Waiting for the live channel to open
    Connecting,
    /// A snapshot fetch is outstanding; events are being queued
    Refreshing,
    /// Events are applied as they arrive
    Steady,
}

/// Identifies one run of a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamToken {
    generation: u64,
}

/// Identifies one snapshot fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    seq: u64,
}

/// Work the driver must carry out, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Start a snapshot fetch and report it back with this ticket
    Fetch(FetchTicket),
    /// The visible log changed; notify the observer with this copy of it
    Changed(Vec<LogEntry>),
    /// Close the live channel
    CloseChannel,
    /// The stream failed; notify the observer (exactly once)
    Failed(StreamError),
}

/// Snapshot/event reconciliation state
#[derive(Debug, Default)]
pub struct LogReconciler {
    state: StreamState,
    /// Bumped on start and on stop; tokens from other generations are stale
    generation: u64,
    /// Set on stop or error; a terminated reconciler never starts again
    terminated: bool,
    /// Newest first
    log: VecDeque<LogEntry>,
    /// Exactly the ids in `log`
    seen: HashSet<EntryId>,
    /// Whether a snapshot has been applied yet
    populated: bool,
    /// Events received while a fetch was outstanding, in arrival order
    pending: VecDeque<LogEntry>,
    refresh_waiting: bool,
    refresh_needed: bool,
    fetch_seq: u64,
    outstanding: Option<FetchTicket>,
    first_message_seen: bool,
}

impl LogReconciler {
    /// Create a stopped reconciler with an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// True from a successful start until stop or a fatal error
    pub fn is_running(&self) -> bool {
        self.state != StreamState::Stopped
    }

    /// Whether `token` belongs to the current, still running generation
    pub fn is_current(&self, token: StreamToken) -> bool {
        self.is_running() && token.generation == self.generation
    }

    /// The held log, newest first
    pub fn log(&self) -> &VecDeque<LogEntry> {
        &self.log
    }

    /// Copy of the held log, newest first
    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.log.iter().cloned().collect()
    }

    /// Number of events waiting for the outstanding fetch
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a snapshot fetch is outstanding
    pub fn refresh_outstanding(&self) -> bool {
        self.refresh_waiting
    }

    /// Whether the outstanding fetch has been marked stale
    pub fn refresh_needed(&self) -> bool {
        self.refresh_needed
    }

    /// Begin a run
    ///
    /// Returns None if already running or already terminated.
    pub fn start(&mut self) -> Option<StreamToken> {
        if self.terminated || self.is_running() {
            return None;
        }
        self.generation += 1;
        self.state = StreamState::Connecting;
        Some(StreamToken {
            generation: self.generation,
        })
    }

    /// End the run and discard in-flight state
    ///
    /// Returns false if the reconciler was not running. The held log is kept
    /// for inspection but never changes again.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = StreamState::Stopped;
        self.terminated = true;
        self.generation += 1;
        self.pending.clear();
        self.refresh_waiting = false;
        self.refresh_needed = false;
        self.outstanding = None;
        true
    }

    /// The live channel is open
    pub fn channel_opened(&mut self, token: StreamToken) -> Vec<Effect> {
        if !self.is_current(token) {
            return Vec::new();
        }
        tracing::debug!(generation = token.generation, "Live channel opened");
        self.request_refresh().into_iter().collect()
    }

    /// A message arrived on the live channel
    pub fn message_received(&mut self, token: StreamToken, payload: &str) -> Vec<Effect> {
        if !self.is_current(token) {
            return Vec::new();
        }
        let entries = match parse_event_payload(payload) {
            Ok(entries) => entries,
            Err(e) => return self.fail(StreamError::DeserializationFailed(e.to_string())),
        };

        let first = !self.first_message_seen;
        self.first_message_seen = true;

        if first || self.refresh_waiting || !self.populated {
            tracing::debug!(
                queued = entries.len(),
                first_message = first,
                "Queueing live events"
            );
            self.pending.extend(entries);
            if first || !self.refresh_waiting {
                return self.request_refresh().into_iter().collect();
            }
            return Vec::new();
        }

        if self.apply_events(entries) {
            vec![Effect::Changed(self.log_snapshot())]
        } else {
            Vec::new()
        }
    }

    /// The live channel closed
    pub fn channel_closed(&mut self, token: StreamToken, reason: Option<String>) -> Vec<Effect> {
        if !self.is_current(token) {
            return Vec::new();
        }
        self.fail(StreamError::TransportClosed { reason })
    }

    /// A snapshot fetch finished
    pub fn fetch_resolved(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<LogEntry>, ApiError>,
    ) -> Vec<Effect> {
        if !self.is_running() || self.outstanding != Some(ticket) {
            tracing::debug!(seq = ticket.seq, "Discarding stale snapshot");
            return Vec::new();
        }
        self.outstanding = None;
        self.refresh_waiting = false;

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => return self.fail(StreamError::SnapshotFetchFailed(e)),
        };

        if self.refresh_needed {
            tracing::debug!(seq = ticket.seq, "Snapshot may be stale, fetching again");
            return self.request_refresh().into_iter().collect();
        }

        let mut effects = Vec::new();
        if self.apply_snapshot(snapshot) {
            effects.push(Effect::Changed(self.log_snapshot()));
        }
        let queued: Vec<LogEntry> = self.pending.drain(..).collect();
        if self.apply_events(queued) {
            effects.push(Effect::Changed(self.log_snapshot()));
        }
        self.state = StreamState::Steady;
        effects
    }

    fn request_refresh(&mut self) -> Option<Effect> {
        if self.refresh_waiting {
            self.refresh_needed = true;
            return None;
        }
        self.refresh_waiting = true;
        self.refresh_needed = false;
        self.state = StreamState::Refreshing;
        self.fetch_seq += 1;
        let ticket = FetchTicket {
            generation: self.generation,
            seq: self.fetch_seq,
        };
        self.outstanding = Some(ticket);
        Some(Effect::Fetch(ticket))
    }

    fn fail(&mut self, error: StreamError) -> Vec<Effect> {
        tracing::warn!(error = %error, "Live log stream failed");
        self.stop();
        vec![Effect::CloseChannel, Effect::Failed(error)]
    }

    /// Replace the log with `snapshot` if it is the first one or adds ids
    fn apply_snapshot(&mut self, snapshot: Vec<LogEntry>) -> bool {
        let (entries, ids) = dedup_snapshot(snapshot);
        if self.populated && ids.is_subset(&self.seen) {
            return false;
        }
        tracing::debug!(entries = entries.len(), "Applying snapshot");
        self.log = entries;
        self.seen = ids;
        self.populated = true;
        true
    }

    /// Prepend unseen entries, then enforce the last limit carried by one
    fn apply_events(&mut self, batch: Vec<LogEntry>) -> bool {
        let mut limit = None;
        let mut inserted = false;

        for mut entry in batch {
            if self.seen.contains(&entry.id) {
                continue;
            }
            if let Some(l) = entry.take_limit() {
                limit = Some(l);
            }
            self.seen.insert(entry.id.clone());
            self.log.push_front(entry);
            inserted = true;
        }

        if let Some(limit) = limit {
            while self.log.len() > limit {
                if let Some(oldest) = self.log.pop_back() {
                    self.seen.remove(&oldest.id);
                }
            }
        }
        inserted
    }
}

fn closed_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

fn dedup_snapshot(snapshot: Vec<LogEntry>) -> (VecDeque<LogEntry>, HashSet<EntryId>) {
    let mut ids = HashSet::with_capacity(snapshot.len());
    let entries = snapshot
        .into_iter()
        .filter_map(|mut entry| {
            entry.limit = None;
            ids.insert(entry.id.clone()).then_some(entry)
        })
        .collect();
    (entries, ids)
}
