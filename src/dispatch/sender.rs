//! Outgoing senders
//!
//! A sender is invoked once per writer-loop pass and decides for itself
//! whether to transmit. Senders that must pace themselves wrap their inner
//! sender in a [`RateLimitedSender`] before registering.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

use crate::link::Connection;
use crate::metrics::METRICS;
use crate::message::Message;

/// Callback invoked on every writer-loop pass to possibly transmit.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, connection: &dyn Connection) -> Result<()>;
}

/// Adapter turning a plain closure into a [`Sender`].
pub struct FnSender<F>(F);

impl<F> FnSender<F>
where
    F: Fn(&dyn Connection) -> Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Sender for FnSender<F>
where
    F: Fn(&dyn Connection) -> Result<()> + Send + Sync,
{
    async fn send(&self, connection: &dyn Connection) -> Result<()> {
        (self.0)(connection)
    }
}

/// Transmits a fixed message on every pass.
///
/// Combine with [`RateLimitedSender`] for periodic beacons such as
/// heartbeats.
pub struct MessageSender {
    message: Message,
}

impl MessageSender {
    pub fn new(message: Message) -> Self {
        Self { message }
    }
}

#[async_trait]
impl Sender for MessageSender {
    async fn send(&self, connection: &dyn Connection) -> Result<()> {
        connection.send(&self.message).await?;
        Ok(())
    }
}

/// Gates an inner sender so it forwards at most once per interval.
///
/// Calls that land inside the interval are dropped, not queued. The first
/// call after construction always forwards; the interval clock restarts on
/// each successful forward, so a failing inner sender is retried on the
/// next pass.
pub struct RateLimitedSender {
    inner: Arc<dyn Sender>,
    interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl RateLimitedSender {
    pub fn new(inner: Arc<dyn Sender>, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_sent: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Sender for RateLimitedSender {
    async fn send(&self, connection: &dyn Connection) -> Result<()> {
        {
            let last_sent = self.last_sent.lock();
            if let Some(at) = *last_sent {
                if at.elapsed() < self.interval {
                    METRICS.send_suppressed();
                    return Ok(());
                }
            }
        }

        self.inner.send(connection).await?;
        *self.last_sent.lock() = Some(Instant::now());
        Ok(())
    }
}
