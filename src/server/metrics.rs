//! Server metrics collection.
//!
//! Aggregate counters only; nothing here identifies a user or a
//! destination. Safe to export to monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-wide server metrics.
pub struct ServerMetrics {
    start_time: Instant,
    /// Connections accepted
    total_connections: AtomicU64,
    /// Connections currently open
    active_connections: AtomicU64,
    /// Connections that completed a Reflex handshake
    sessions: AtomicU64,
    /// Connections spliced to a fallback back-end
    fallbacks: AtomicU64,
    /// Connections that ended in a protocol or I/O error
    errors: AtomicU64,
}

impl ServerMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            sessions: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Record an accepted connection.
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection ending.
    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a completed Reflex session.
    pub fn session_completed(&self) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fallback handoff.
    pub fn fallback_taken(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection that failed.
    pub fn connection_failed(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            sessions: self.sessions.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Seconds since the server started
    pub uptime_secs: u64,
    /// Connections accepted
    pub total_connections: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Completed Reflex sessions
    pub sessions: u64,
    /// Fallback handoffs
    pub fallbacks: u64,
    /// Failed connections
    pub errors: u64,
}
