//! Concurrent dispatch core
//!
//! Snapshot-based registries plus the reader and writer loops that drive
//! them.

mod handler;
mod reader;
mod registry;
mod sender;
mod writer;

pub use handler::{FnHandler, LoggingHandler, MessageHandler};
pub use reader::ConnectionReader;
pub use registry::{HandlerKey, Registry};
pub use sender::{FnSender, MessageSender, RateLimitedSender, Sender};
pub use writer::{ConnectionWriter, WriterConfig};

/// Lifecycle of a background loop.
///
/// `Stopped` is terminal: it is reached on an explicit `stop()` or on a
/// fatal transport error, never left again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Created, loop not yet spawned
    Idle,
    /// Loop task is running
    Running,
    /// Loop has terminated
    Stopped,
}
