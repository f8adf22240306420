//! Lightweight counters tracking dispatches, individual endpoint attempts,
//! and how each attempt ended, so the client can expose aggregated snapshots
//! without leaking implementation details to downstream consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct RpcMetrics {
    total_dispatches: AtomicU64,
    total_attempts: AtomicU64,
    total_failovers: AtomicU64,
    total_successes: AtomicU64,
    transport_errors: AtomicU64,
    remote_errors: AtomicU64,
    status_errors: AtomicU64,
    fatal_errors: AtomicU64,
    total_latency_ns: AtomicU64,
}

impl RpcMetrics {
    pub(crate) fn record_dispatch(&self) {
        self.total_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_attempt(&self, latency: Duration) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.total_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failover(&self) {
        self.total_failovers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_error(&self) {
        self.remote_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_status_error(&self) {
        self.status_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Failures that end a dispatch on the spot: bad endpoints, request
    /// construction, body reads and undecodable responses.
    pub(crate) fn record_fatal_error(&self) {
        self.fatal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RpcMetricsSnapshot {
        let total_attempts = self.total_attempts.load(Ordering::Relaxed);
        let total_latency_ns = self.total_latency_ns.load(Ordering::Relaxed);

        let average_attempt_latency_ms = if total_attempts == 0 {
            0.0
        } else {
            (total_latency_ns as f64 / total_attempts as f64) / 1_000_000.0
        };

        RpcMetricsSnapshot {
            total_dispatches: self.total_dispatches.load(Ordering::Relaxed),
            total_attempts,
            total_failovers: self.total_failovers.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            status_errors: self.status_errors.load(Ordering::Relaxed),
            fatal_errors: self.fatal_errors.load(Ordering::Relaxed),
            average_attempt_latency_ms,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RpcMetricsSnapshot {
    pub total_dispatches: u64,
    pub total_attempts: u64,
    pub total_failovers: u64,
    pub total_successes: u64,
    pub transport_errors: u64,
    pub remote_errors: u64,
    pub status_errors: u64,
    pub fatal_errors: u64,
    pub average_attempt_latency_ms: f64,
}
