//! Connection reader
//!
//! Owns the background loop that pulls messages off the link and fans them
//! out to registered handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::handler::MessageHandler;
use super::registry::{HandlerKey, Registry};
use super::LoopPhase;
use crate::error::{Error, TransportError};
use crate::link::Connection;
use crate::message::Message;
use crate::metrics::METRICS;

/// Reads messages from a [`Connection`] on a background task and dispatches
/// each one to every registered handler.
///
/// Handlers are invoked in registration order. Dispatch works on a snapshot
/// of the registry, so handlers can be added and removed while a pass is in
/// flight; an entry removed mid-pass may still see one trailing call.
pub struct ConnectionReader {
    connection: Arc<dyn Connection>,
    handlers: Registry<dyn MessageHandler>,
    phase_tx: watch::Sender<LoopPhase>,
    shutdown_tx: watch::Sender<bool>,
    started: AtomicBool,
    transport_error: Mutex<Option<TransportError>>,
}

impl ConnectionReader {
    /// Create a reader for the given connection
    pub fn new(connection: Arc<dyn Connection>) -> Arc<Self> {
        let (phase_tx, _) = watch::channel(LoopPhase::Idle);
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            connection,
            handlers: Registry::new(),
            phase_tx,
            shutdown_tx,
            started: AtomicBool::new(false),
            transport_error: Mutex::new(None),
        })
    }

    /// Register a handler under a generated key, returned for later removal.
    pub fn add_message_handler(&self, handler: Arc<dyn MessageHandler>) -> HandlerKey {
        self.handlers.insert_anonymous(handler)
    }

    /// Register a handler under an explicit key. Last write wins.
    pub fn add_message_handler_with_key(
        &self,
        key: impl Into<HandlerKey>,
        handler: Arc<dyn MessageHandler>,
    ) -> HandlerKey {
        self.handlers.insert(key.into(), handler)
    }

    /// Remove a handler, returning it.
    pub fn remove_message_handler(&self, key: &HandlerKey) -> Result<Arc<dyn MessageHandler>, Error> {
        self.handlers.remove(key)
    }

    /// Consume the most recent cached message of `message_type` from the
    /// transport's last-seen cache.
    pub fn get_cached_message(&self, message_type: &str) -> Result<Message, Error> {
        self.connection
            .pop_cached(message_type)
            .ok_or_else(|| Error::NoCachedMessage(message_type.to_string()))
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

    /// Spawn the dispatch loop.
    ///
    /// May be called at most once; a second call fails with
    /// [`Error::AlreadyStarted`]. The returned handle joins the loop task;
    /// use [`stop`](Self::stop) to request termination.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, Error> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        self.phase_tx.send_replace(LoopPhase::Running);
        let reader = self.clone();
        Ok(tokio::spawn(async move { reader.run().await }))
    }

    /// Signal the dispatch loop to terminate after the current iteration
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    async fn run(&self) {
        info!("Started message handling loop");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // stop() may have landed before this task got its first poll.
        while !*shutdown_rx.borrow() {
            tokio::select! {
                received = self.connection.receive() => {
                    match received {
                        Ok(Some(message)) => self.dispatch(&message).await,
                        // Poll interval elapsed with no complete frame
                        Ok(None) => {}
                        Err(e) => {
                            error!(error = %e, "Link failed, stopping reader");
                            *self.transport_error.lock() = Some(e);
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("Reader shutting down");
                        break;
                    }
                }
            }
        }

        self.phase_tx.send_replace(LoopPhase::Stopped);
    }

    async fn dispatch(&self, message: &Message) {
        METRICS.message_received();

        for (key, handler) in self.handlers.snapshot() {
            METRICS.handler_invoked();
            if let Err(e) = handler.on_message(message, self.connection.as_ref()).await {
                METRICS.handler_error();
                warn!(
                    handler = %key,
                    message_type = %message.get_type(),
                    error = %e,
                    "Message handler failed"
                );
            }
        }
    }
}
