//! Connection writer
//!
//! Owns the background loop that invokes every registered sender against
//! the link, once per pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::registry::{HandlerKey, Registry};
use super::sender::Sender;
use super::LoopPhase;
use crate::error::{Error, TransportError};
use crate::link::Connection;
use crate::metrics::METRICS;

/// Writer loop configuration.
#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    /// Minimum delay between passes.
    ///
    /// With `None` the loop runs passes back to back, yielding to the
    /// scheduler between them; sender count and per-pass cost then set the
    /// outgoing rate and the CPU bill. Production deployments should set an
    /// interval.
    pub tick_interval: Option<Duration>,
}

/// Invokes every registered [`Sender`] against the connection on a
/// background task, one pass at a time in registration order.
///
/// There is no throttling at this layer beyond the configured tick
/// interval; a sender that must pace itself wraps its callable in a
/// [`RateLimitedSender`](super::RateLimitedSender) before registering.
pub struct ConnectionWriter {
    connection: Arc<dyn Connection>,
    senders: Registry<dyn Sender>,
    config: WriterConfig,
    phase_tx: watch::Sender<LoopPhase>,
    shutdown_tx: watch::Sender<bool>,
    started: AtomicBool,
    transport_error: Mutex<Option<TransportError>>,
}

impl ConnectionWriter {
    /// Create a writer for the given connection
    pub fn new(connection: Arc<dyn Connection>, config: WriterConfig) -> Arc<Self> {
        let (phase_tx, _) = watch::channel(LoopPhase::Idle);
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            connection,
            senders: Registry::new(),
            config,
            phase_tx,
            shutdown_tx,
            started: AtomicBool::new(false),
            transport_error: Mutex::new(None),
        })
    }

    /// Register a sender under a generated key, returned for later removal.
    pub fn add_sender(&self, sender: Arc<dyn Sender>) -> HandlerKey {
        self.senders.insert_anonymous(sender)
    }

    /// Register a sender under an explicit key. Last write wins.
    pub fn add_sender_with_key(
        &self,
        key: impl Into<HandlerKey>,
        sender: Arc<dyn Sender>,
    ) -> HandlerKey {
        self.senders.insert(key.into(), sender)
    }

    /// Remove a sender, returning it.
    pub fn remove_sender(&self, key: &HandlerKey) -> Result<Arc<dyn Sender>, Error> {
        self.senders.remove(key)
    }

    /// Current loop phase
    pub fn phase(&self) -> LoopPhase {
        *self.phase_tx.borrow()
    }

    /// Watch channel following phase transitions
    pub fn watch_phase(&self) -> watch::Receiver<LoopPhase> {
        self.phase_tx.subscribe()
    }

    /// The transport error that stopped the loop, if any
    pub fn transport_error(&self) -> Option<TransportError> {
        self.transport_error.lock().clone()
    }

    /// Spawn the sending loop.
    ///
    /// May be called at most once; a second call fails with
    /// [`Error::AlreadyStarted`].
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, Error> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        self.phase_tx.send_replace(LoopPhase::Running);
        let writer = self.clone();
        Ok(tokio::spawn(async move { writer.run().await }))
    }

    /// Signal the sending loop to terminate after the current pass
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    async fn run(&self) {
        debug!("Started sending loop");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // stop() may have landed before this task got its first poll.
        while !*shutdown_rx.borrow() {
            if !self.run_pass().await {
                break;
            }

            tokio::select! {
                _ = idle(self.config.tick_interval) => {}
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("Writer shutting down");
                        break;
                    }
                }
            }
        }

        self.phase_tx.send_replace(LoopPhase::Stopped);
    }

    /// Run one pass over the sender snapshot. Returns false when the
    /// transport has failed and the loop must stop.
    async fn run_pass(&self) -> bool {
        METRICS.sender_pass();

        for (key, sender) in self.senders.snapshot() {
            if let Err(e) = sender.send(self.connection.as_ref()).await {
                // Transport failures end the loop; sender-local failures
                // only cost that sender its turn.
                if let Some(transport) = e.downcast_ref::<TransportError>() {
                    error!(sender = %key, error = %transport, "Link failed, stopping writer");
                    *self.transport_error.lock() = Some(transport.clone());
                    return false;
                }
                METRICS.sender_error();
                warn!(sender = %key, error = %e, "Sender failed");
            }
        }

        true
    }
}

/// Wait out the configured tick, or just yield when none is set.
async fn idle(tick_interval: Option<Duration>) {
    match tick_interval {
        Some(interval) => tokio::time::sleep(interval).await,
        None => tokio::task::yield_now().await,
    }
}
