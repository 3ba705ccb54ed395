//! Shared fakes and helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

use telelink::{Connection, Message, MessageHandler, Sender};

/// Records the type of every message it sees.
pub struct RecordingHandler {
    seen: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn on_message(&self, message: &Message, _connection: &dyn Connection) -> Result<()> {
        self.seen.lock().push(message.get_type().to_string());
        Ok(())
    }
}

/// Fails on every invocation.
pub struct FailingHandler;

#[async_trait]
impl MessageHandler for FailingHandler {
    async fn on_message(&self, _message: &Message, _connection: &dyn Connection) -> Result<()> {
        anyhow::bail!("handler exploded")
    }
}

/// Counts how many times it is invoked, without transmitting.
pub struct CountingSender {
    calls: AtomicU64,
}

impl CountingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU64::new(0),
        })
    }

    pub fn count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sender for CountingSender {
    async fn send(&self, _connection: &dyn Connection) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails on every pass.
pub struct FailingSender;

#[async_trait]
impl Sender for FailingSender {
    async fn send(&self, _connection: &dyn Connection) -> Result<()> {
        anyhow::bail!("sender exploded")
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
