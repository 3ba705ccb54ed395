//! Error types
//!
//! Registry and lifecycle errors propagate to the caller; errors raised by
//! user-supplied handlers and senders are caught and logged by the owning
//! loop and never reach this taxonomy.

use thiserror::Error;

use crate::dispatch::HandlerKey;

/// Errors surfaced by the public API.
#[derive(Debug, Error)]
pub enum Error {
    /// Removal was requested for a key with no registered entry.
    #[error("no entry registered under key `{0}`")]
    HandlerNotFound(HandlerKey),

    /// The transport cache holds no message of the requested type.
    #[error("no cached message of type `{0}`")]
    NoCachedMessage(String),

    /// `start()` was called on a loop that was already started.
    #[error("loop already started")]
    AlreadyStarted,

    /// The underlying link failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure of the underlying link.
///
/// Fatal to the loop that observes it; the loop records the error and
/// transitions to `Stopped` instead of crashing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// I/O failure reported by the transport
    #[error("link i/o failure: {0}")]
    Io(String),

    /// The peer end of the link has gone away
    #[error("link closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoCachedMessage("HEARTBEAT".to_string());
        assert_eq!(err.to_string(), "no cached message of type `HEARTBEAT`");

        let err = Error::from(TransportError::Closed);
        assert_eq!(err.to_string(), "link closed");
    }
}
