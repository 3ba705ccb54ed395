//! Atomic counters for hot-path metrics
//!
//! Lock-free counters that can be safely updated from any loop or handler.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics instance
pub static METRICS: Metrics = Metrics::new();

/// Atomic metrics counters
pub struct Metrics {
    // Inbound dispatch
    pub messages_received: AtomicU64,
    pub handler_invocations: AtomicU64,
    pub handler_errors: AtomicU64,

    // Outbound dispatch
    pub sender_passes: AtomicU64,
    pub sender_errors: AtomicU64,
    pub sends_suppressed: AtomicU64,

    // Liveness
    pub link_lost_events: AtomicU64,
    pub link_restored_events: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            handler_invocations: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            sender_passes: AtomicU64::new(0),
            sender_errors: AtomicU64::new(0),
            sends_suppressed: AtomicU64::new(0),
            link_lost_events: AtomicU64::new(0),
            link_restored_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn handler_invoked(&self) {
        self.handler_invocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn sender_pass(&self) {
        self.sender_passes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn sender_error(&self) {
        self.sender_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn send_suppressed(&self) {
        self.sends_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn link_lost(&self) {
        self.link_lost_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn link_restored(&self) {
        self.link_restored_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            handler_invocations: self.handler_invocations.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            sender_passes: self.sender_passes.load(Ordering::Relaxed),
            sender_errors: self.sender_errors.load(Ordering::Relaxed),
            sends_suppressed: self.sends_suppressed.load(Ordering::Relaxed),
            link_lost_events: self.link_lost_events.load(Ordering::Relaxed),
            link_restored_events: self.link_restored_events.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics for reporting
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub handler_invocations: u64,
    pub handler_errors: u64,
    pub sender_passes: u64,
    pub sender_errors: u64,
    pub sends_suppressed: u64,
    pub link_lost_events: u64,
    pub link_restored_events: u64,
}
