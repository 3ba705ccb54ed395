//! Link abstraction
//!
//! The transport boundary: opening a device, framing, and decoding all live
//! on the other side of the [`Connection`] trait. This crate only pulls
//! decoded messages off one end and pushes messages into the other.

mod channel;

pub use channel::ChannelConnection;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::Message;

/// One end of a framed telemetry link.
///
/// Implementations must be internally synchronized: the reader loop, the
/// writer loop, and any handler may touch the same connection concurrently.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Wait for the next decoded message.
    ///
    /// `Ok(None)` means the transport's poll interval elapsed without a
    /// complete frame; the caller should simply try again. An `Err` is
    /// fatal to the link.
    async fn receive(&self) -> Result<Option<Message>, TransportError>;

    /// Write one message to the link.
    async fn send(&self, message: &Message) -> Result<(), TransportError>;

    /// Remove and return the most recent message of `message_type` from the
    /// transport's last-seen cache.
    ///
    /// Transports without a cache return `None` for every type.
    fn pop_cached(&self, message_type: &str) -> Option<Message> {
        let _ = message_type;
        None
    }
}
