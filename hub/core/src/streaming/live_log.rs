//! Live Log Stream
//!
//! Async driver around [`LogReconciler`]. It opens the transport, pumps
//! channel events into the reconciler, runs the snapshot fetches the
//! reconciler asks for, and delivers notifications to the observer.
//!
//! Every continuation (a channel event, a finished fetch, `start`, `stop`)
//! runs under one re-entrant lock, so the reconciler sees a strictly serial
//! sequence of inputs, the same as a single-threaded event loop would give
//! it. Observers are called under that lock too, which lets them call back
//! into the stream, and makes `stop()` from another thread wait for an
//! in-progress callback before returning.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tokio::sync::{mpsc, oneshot};

use crate::api::ApiError;
use crate::model::{LogEntry, LogResource};
use crate::snapshot::SnapshotFetcher;
use crate::transport::{ChannelCloser, LogTransport, TransportEvent};

use super::observer::{LogObserver, NoopObserver};
use super::reconcile::{Effect, FetchTicket, LogReconciler, StreamState, StreamToken};

/// Live, deduplicated, size-bounded view of one resource's log
///
/// Created for exactly one resource, started once, stopped at most once.
/// A stopped (or failed) stream cannot be restarted; create a new one.
/// Dropping the stream stops it.
///
/// `start()` spawns tasks and must be called from within a tokio runtime.
pub struct LiveLogStream {
    shared: Arc<Shared>,
}

struct Shared {
    resource: LogResource,
    transport: Arc<dyn LogTransport>,
    fetcher: Arc<dyn SnapshotFetcher>,
    core: ReentrantMutex<RefCell<Core>>,
}

struct Core {
    reconciler: LogReconciler,
    observer: Arc<dyn LogObserver>,
    run: Option<RunHandles>,
}

/// Ends the current run: closes the channel and halts the pump task
struct RunHandles {
    closer: ChannelCloser,
    halt: oneshot::Sender<()>,
}

impl RunHandles {
    fn release(self) {
        self.closer.close();
        let _ = self.halt.send(());
    }
}

type CoreGuard<'a> = ReentrantMutexGuard<'a, RefCell<Core>>;

impl LiveLogStream {
    /// Create a stopped stream for `resource`
    pub fn new(
        resource: impl Into<LogResource>,
        transport: Arc<dyn LogTransport>,
        fetcher: Arc<dyn SnapshotFetcher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                resource: resource.into(),
                transport,
                fetcher,
                core: ReentrantMutex::new(RefCell::new(Core {
                    reconciler: LogReconciler::new(),
                    observer: Arc::new(NoopObserver),
                    run: None,
                })),
            }),
        }
    }

    /// The resource this stream follows
    pub fn resource(&self) -> &LogResource {
        &self.shared.resource
    }

    /// Replace the observer
    ///
    /// Set it before `start()`; notifications already being delivered go to
    /// the previous observer.
    pub fn set_observer(&self, observer: Arc<dyn LogObserver>) {
        let guard = self.shared.core.lock();
        guard.borrow_mut().observer = observer;
    }

    /// Open the live channel
    ///
    /// No-op if the stream is running or has already been stopped.
    pub fn start(&self) {
        let guard = self.shared.core.lock();
        let started = guard.borrow_mut().reconciler.start();
        let Some(token) = started else {
            tracing::debug!(resource = %self.shared.resource, "Ignoring start of used stream");
            return;
        };

        let (events, closer) = self.shared.transport.open(&self.shared.resource).split();
        let (halt, halted) = oneshot::channel();
        guard.borrow_mut().run = Some(RunHandles { closer, halt });
        drop(guard);

        tracing::info!(resource = %self.shared.resource, "Live log stream started");
        tokio::spawn(Arc::clone(&self.shared).pump(token, events, halted));
    }

    /// Close the live channel and discard in-flight state
    ///
    /// Idempotent. No callback is delivered after this returns, even if a
    /// snapshot fetch resolves later. The pump task exits promptly whether
    /// or not the other end of the channel is still alive.
    pub fn stop(&self) {
        let guard = self.shared.core.lock();
        let run = {
            let mut core = guard.borrow_mut();
            if !core.reconciler.stop() {
                return;
            }
            core.run.take()
        };
        if let Some(run) = run {
            run.release();
        }
        tracing::info!(resource = %self.shared.resource, "Live log stream stopped");
    }

    /// True from a successful `start()` until `stop()` or a fatal error
    pub fn is_running(&self) -> bool {
        let guard = self.shared.core.lock();
        let running = guard.borrow().reconciler.is_running();
        running
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        let guard = self.shared.core.lock();
        let state = guard.borrow().reconciler.state();
        state
    }

    /// Copy of the current log, newest first
    pub fn log(&self) -> Vec<LogEntry> {
        let guard = self.shared.core.lock();
        let log = guard.borrow().reconciler.log_snapshot();
        log
    }
}

impl Drop for LiveLogStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for LiveLogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveLogStream")
            .field("resource", &self.shared.resource)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Shared {
    /// Forward channel events until the run ends
    async fn pump(
        self: Arc<Self>,
        token: StreamToken,
        mut events: mpsc::Receiver<TransportEvent>,
        mut halted: oneshot::Receiver<()>,
    ) {
        loop {
            let event = tokio::select! {
                _ = &mut halted => return,
                event = events.recv() => event,
            };
            let Some(event) = event else { break };
            if !self.on_transport_event(token, event) {
                return;
            }
        }
        // Transport side went away without saying why
        self.on_transport_event(
            token,
            TransportEvent::Closed {
                reason: Some("transport dropped the channel".to_string()),
            },
        );
    }

    /// Returns whether the run is still current afterwards
    fn on_transport_event(self: &Arc<Self>, token: StreamToken, event: TransportEvent) -> bool {
        let guard = self.core.lock();
        let effects = {
            let mut core = guard.borrow_mut();
            match event {
                TransportEvent::Opened => core.reconciler.channel_opened(token),
                TransportEvent::Message(text) => core.reconciler.message_received(token, &text),
                TransportEvent::Closed { reason } => {
                    core.reconciler.channel_closed(token, reason)
                }
            }
        };
        self.run_effects(&guard, token, effects);
        let current = guard.borrow().reconciler.is_current(token);
        current
    }

    fn on_fetch_resolved(
        self: &Arc<Self>,
        token: StreamToken,
        ticket: FetchTicket,
        result: Result<Vec<LogEntry>, ApiError>,
    ) {
        let guard = self.core.lock();
        let effects = guard.borrow_mut().reconciler.fetch_resolved(ticket, result);
        self.run_effects(&guard, token, effects);
    }

    fn run_effects(self: &Arc<Self>, guard: &CoreGuard<'_>, token: StreamToken, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch(ticket) => {
                    if !guard.borrow().reconciler.is_current(token) {
                        continue;
                    }
                    tracing::debug!(resource = %self.resource, "Fetching snapshot");
                    let shared = Arc::clone(self);
                    tokio::spawn(async move {
                        let result = shared.fetcher.fetch(&shared.resource).await;
                        shared.on_fetch_resolved(token, ticket, result);
                    });
                }
                Effect::Changed(log) => {
                    let observer = {
                        let core = guard.borrow();
                        // An earlier callback in this batch may have stopped us
                        if !core.reconciler.is_current(token) {
                            continue;
                        }
                        Arc::clone(&core.observer)
                    };
                    observer.on_change(&log);
                }
                Effect::CloseChannel => {
                    let run = guard.borrow_mut().run.take();
                    if let Some(run) = run {
                        run.release();
                    }
                }
                Effect::Failed(error) => {
                    let observer = Arc::clone(&guard.borrow().observer);
                    observer.on_error(&error);
                }
            }
        }
    }
}
