//! Telelink - concurrency wrapper for framed telemetry links
//!
//! This library reads decoded messages off a telemetry connection on a
//! background task and fans them out to registered handlers, drives
//! registered senders on a second background task, and watches the message
//! stream for link loss.
//!
//! The transport itself (device setup, framing, decoding) lives behind the
//! [`Connection`] trait and is supplied by the caller.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod message;
pub mod metrics;
pub mod util;
pub mod watchdog;

pub use config::Config;
pub use dispatch::{
    ConnectionReader, ConnectionWriter, FnHandler, FnSender, HandlerKey, LoggingHandler, LoopPhase,
    MessageHandler, MessageSender, RateLimitedSender, Sender, WriterConfig,
};
pub use error::{Error, TransportError};
pub use link::{ChannelConnection, Connection};
pub use message::{Message, HEARTBEAT_TYPE};
pub use watchdog::{LinkEvent, MessageFilter, Watchdog};

/// Crate version for display
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
