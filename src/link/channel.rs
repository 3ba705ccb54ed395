//! In-process loopback link
//!
//! A pair of connections joined by bounded channels, used for simulation
//! and tests. Real serial/radio transports implement [`Connection`] outside
//! this crate.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};

use super::Connection;
use crate::error::TransportError;
use crate::message::Message;

/// One endpoint of an in-process link.
///
/// Messages sent on one endpoint arrive at `receive()` on the other. The
/// receive path maintains the per-type last-seen cache that
/// [`Connection::pop_cached`] consumes, mirroring what frame-decoding
/// transports keep for telemetry streams.
pub struct ChannelConnection {
    rx: Mutex<mpsc::Receiver<Message>>,
    tx: mpsc::Sender<Message>,
    cache: DashMap<String, Message>,
}

impl ChannelConnection {
    /// Create a connected pair of endpoints with the given channel capacity.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (near_tx, far_rx) = mpsc::channel(capacity);
        let (far_tx, near_rx) = mpsc::channel(capacity);

        let near = Self {
            rx: Mutex::new(near_rx),
            tx: near_tx,
            cache: DashMap::new(),
        };
        let far = Self {
            rx: Mutex::new(far_rx),
            tx: far_tx,
            cache: DashMap::new(),
        };

        (near, far)
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    async fn receive(&self) -> Result<Option<Message>, TransportError> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(message) => {
                self.cache
                    .insert(message.get_type().to_string(), message.clone());
                Ok(Some(message))
            }
            // Peer endpoint dropped: the link is gone for good.
            None => Err(TransportError::Closed),
        }
    }

    async fn send(&self, message: &Message) -> Result<(), TransportError> {
        self.tx
            .send(message.clone())
            .await
            .map_err(|_| TransportError::Closed)
    }

    fn pop_cached(&self, message_type: &str) -> Option<Message> {
        self.cache.remove(message_type).map(|(_, message)| message)
    }
}
