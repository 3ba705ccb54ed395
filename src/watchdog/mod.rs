//! Link liveness watchdog
//!
//! Tracks time since the last accepted message and raises link-loss and
//! recovery events. Two coupled paths: the accept path runs synchronously
//! inside message dispatch, the poll loop runs on its own background task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info, warn};

use crate::dispatch::MessageHandler;
use crate::error::Error;
use crate::link::Connection;
use crate::message::{Message, HEARTBEAT_TYPE};
use crate::metrics::METRICS;

/// Liveness transitions emitted by a [`Watchdog`].
///
/// `Lost` and `Restored` strictly alternate: a second `Lost` cannot fire
/// before a `Restored`, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// No accepted message for longer than the configured timeout
    Lost,
    /// An accepted message arrived after the link was reported lost
    Restored,
}

/// Which messages count as proof of life.
#[derive(Debug, Clone)]
pub enum MessageFilter {
    /// Every message resets the liveness clock
    Any,
    /// Only messages of the given type reset the clock
    OfType(String),
}

impl MessageFilter {
    pub fn accepts(&self, message: &Message) -> bool {
        match self {
            MessageFilter::Any => true,
            MessageFilter::OfType(t) => message.get_type() == t,
        }
    }
}

struct LivenessState {
    last_seen: Instant,
    notified: bool,
}

/// Inactivity watchdog over a message stream.
///
/// `last_seen` starts at construction time, so a watchdog that never sees
/// an accepted message fires exactly one [`LinkEvent::Lost`] after the
/// timeout. The poll interval equals the timeout, which bounds detection
/// latency to `[timeout, 2 * timeout)`.
///
/// Implements [`MessageHandler`], so it can be registered directly on a
/// [`ConnectionReader`](crate::dispatch::ConnectionReader).
pub struct Watchdog {
    timeout: Duration,
    filter: MessageFilter,
    state: Mutex<LivenessState>,
    event_tx: broadcast::Sender<LinkEvent>,
    shutdown_tx: watch::Sender<bool>,
    started: AtomicBool,
}

impl Watchdog {
    /// Watchdog where any message counts as proof of life
    pub fn new(timeout: Duration, filter: MessageFilter) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(16);
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            timeout,
            filter,
            state: Mutex::new(LivenessState {
                last_seen: Instant::now(),
                notified: false,
            }),
            event_tx,
            shutdown_tx,
            started: AtomicBool::new(false),
        })
    }

    /// Watchdog that only counts heartbeat frames as proof of life
    pub fn heartbeat(timeout: Duration) -> Arc<Self> {
        Self::new(timeout, MessageFilter::OfType(HEARTBEAT_TYPE.to_string()))
    }

    /// Subscribe to liveness transitions
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the link is currently reported lost
    pub fn link_lost(&self) -> bool {
        self.state.lock().notified
    }

    /// Feed one message through the accept path.
    ///
    /// An accepted message resets the liveness clock; if the link had been
    /// reported lost, [`LinkEvent::Restored`] fires immediately.
    pub fn observe(&self, message: &Message) {
        if !self.filter.accepts(message) {
            return;
        }

        let mut state = self.state.lock();
        state.last_seen = Instant::now();

        if state.notified {
            state.notified = false;
            METRICS.link_restored();
            info!("Connection restored");
            let _ = self.event_tx.send(LinkEvent::Restored);
        }
    }

    /// Spawn the poll loop.
    ///
    /// May be called at most once; a second call fails with
    /// [`Error::AlreadyStarted`].
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, Error> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let watchdog = self.clone();
        Ok(tokio::spawn(async move { watchdog.run().await }))
    }

    /// Signal the poll loop to terminate
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    async fn run(&self) {
        debug!(timeout_secs = self.timeout.as_secs_f64(), "Started liveness poll loop");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // stop() may have landed before this task got its first poll.
        while !*shutdown_rx.borrow() {
            tokio::select! {
                _ = time::sleep(self.timeout) => self.check_timed_out(),
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("Watchdog shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn check_timed_out(&self) {
        let mut state = self.state.lock();
        if state.last_seen.elapsed() >= self.timeout && !state.notified {
            state.notified = true;
            METRICS.link_lost();
            warn!(
                timeout_secs = self.timeout.as_secs_f64(),
                "Connection lost"
            );
            let _ = self.event_tx.send(LinkEvent::Lost);
        }
    }
}

#[async_trait]
impl MessageHandler for Watchdog {
    async fn on_message(&self, message: &Message, _connection: &dyn Connection) -> Result<()> {
        self.observe(message);
        Ok(())
    }
}
