//! Session Metrics
//!
//! Counters describing what a server has done since it started. They are
//! observational only: admission decisions never read them.
//!
//! Uses atomic counters for thread-safe metrics collection. One instance is
//! owned by each server and shared with its sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Metrics {
    /// Connections accepted by the listener
    pub connections_total: AtomicU64,
    /// Sessions that received `OK`
    pub sessions_admitted: AtomicU64,
    /// Sessions that received `REFUSED`
    pub sessions_refused: AtomicU64,
    /// Queries answered with a matching collection
    pub queries_matched: AtomicU64,
    /// Queries answered with a random fallback record
    pub queries_fallback: AtomicU64,
    /// Frames written to clients
    pub frames_sent: AtomicU64,
    /// Payload bytes written to clients
    pub bytes_sent: AtomicU64,
    /// Sessions ended by a socket failure
    pub connection_errors: AtomicU64,
    /// Sessions ended by a peer breaking the protocol
    pub protocol_errors: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            sessions_admitted: AtomicU64::new(0),
            sessions_refused: AtomicU64::new(0),
            queries_matched: AtomicU64::new(0),
            queries_fallback: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn connection_accepted(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_admitted(&self) {
        self.sessions_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_refused(&self) {
        self.sessions_refused.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an answered query; `fallback` marks the random-record branch
    pub fn query_answered(&self, fallback: bool) {
        if fallback {
            self.queries_fallback.fetch_add(1, Ordering::Relaxed);
        } else {
            self.queries_matched.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn frame_sent(&self, byte_count: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            sessions_admitted: self.sessions_admitted.load(Ordering::Relaxed),
            sessions_refused: self.sessions_refused.load(Ordering::Relaxed),
            queries_matched: self.queries_matched.load(Ordering::Relaxed),
            queries_fallback: self.queries_fallback.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            sessions_admitted = snapshot.sessions_admitted,
            sessions_refused = snapshot.sessions_refused,
            queries_matched = snapshot.queries_matched,
            queries_fallback = snapshot.queries_fallback,
            frames_sent = snapshot.frames_sent,
            bytes_sent = snapshot.bytes_sent,
            connection_errors = snapshot.connection_errors,
            protocol_errors = snapshot.protocol_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Server metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub sessions_admitted: u64,
    pub sessions_refused: u64,
    pub queries_matched: u64,
    pub queries_fallback: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub connection_errors: u64,
    pub protocol_errors: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
