//! Send-path counters.
//!
//! Commands that never reach the device are not reported to callers, so the
//! session counts them here instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Snapshot of send-path counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMetrics {
    /// Frames the transport accepted.
    pub written: u64,
    /// Frames the transport rejected.
    pub failed: u64,
    /// Commands skipped because the cache showed no change.
    pub suppressed: u64,
    /// Sends discarded because no link was held.
    pub dropped_not_connected: u64,
    /// Sends discarded by the rate limiter.
    pub dropped_rate_limited: u64,
    /// Total time spent in transport writes.
    pub total_write_ms: u64,
    /// Slowest transport write.
    pub max_write_ms: Option<u64>,
}

impl SendMetrics {
    /// All sends that were dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.dropped_not_connected + self.dropped_rate_limited
    }

    /// Average transport write duration.
    pub fn avg_write_ms(&self) -> Option<f64> {
        let attempts = self.written + self.failed;
        (attempts > 0).then(|| self.total_write_ms as f64 / attempts as f64)
    }
}

/// Thread-safe counters behind [`SendMetrics`].
#[derive(Debug, Default)]
pub struct AtomicSendMetrics {
    written: AtomicU64,
    failed: AtomicU64,
    suppressed: AtomicU64,
    dropped_not_connected: AtomicU64,
    dropped_rate_limited: AtomicU64,
    total_write_ms: AtomicU64,
    max_write_ms: AtomicU64,
}

impl AtomicSendMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write the transport accepted.
    pub fn record_written(&self, duration: Duration) {
        self.written.fetch_add(1, Ordering::Relaxed);
        self.record_duration(duration);
    }

    /// Record a write the transport rejected.
    pub fn record_failed(&self, duration: Duration) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record_duration(duration);
    }

    /// Record a command skipped by the cache.
    pub fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a send dropped for lack of a link.
    pub fn record_not_connected(&self) {
        self.dropped_not_connected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a send dropped by the rate limiter.
    pub fn record_rate_limited(&self) {
        self.dropped_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    fn record_duration(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.total_write_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_write_ms.fetch_max(ms, Ordering::Relaxed);
    }

    /// Get a snapshot of the current counters.
    pub fn snapshot(&self) -> SendMetrics {
        let written = self.written.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        SendMetrics {
            written,
            failed,
            suppressed: self.suppressed.load(Ordering::Relaxed),
            dropped_not_connected: self.dropped_not_connected.load(Ordering::Relaxed),
            dropped_rate_limited: self.dropped_rate_limited.load(Ordering::Relaxed),
            total_write_ms: self.total_write_ms.load(Ordering::Relaxed),
            max_write_ms: (written + failed > 0)
                .then(|| self.max_write_ms.load(Ordering::Relaxed)),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.written,
            &self.failed,
            &self.suppressed,
            &self.dropped_not_connected,
            &self.dropped_rate_limited,
            &self.total_write_ms,
            &self.max_write_ms,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
