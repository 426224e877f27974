//! Token-bucket rate limiter for the BLE write path.
//!
//! The bucket holds up to `max_per_second` tokens and refills continuously
//! at `max_per_second` tokens per second. Every admitted send consumes one
//! token; a send finding the bucket empty is denied, not delayed.

use std::time::Duration;

use tokio::time::Instant;

/// Default cap on writes to the device per second.
pub const DEFAULT_MAX_SENDS_PER_SECOND: u32 = 20;

/// Token bucket admitting at most `max_per_second` sends per second.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    capacity: f64,
    tokens: f64,
    refill_interval: Duration,
    last_refill: Instant,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_second(DEFAULT_MAX_SENDS_PER_SECOND)
    }
}

impl RateLimiter {
    /// Create a full bucket admitting `max_per_second` sends per second.
    ///
    /// A rate of zero is treated as one send per second.
    pub fn per_second(max_per_second: u32) -> Self {
        let rate = max_per_second.max(1);
        Self {
            capacity: f64::from(rate),
            tokens: f64::from(rate),
            refill_interval: Duration::from_secs(1) / rate,
            last_refill: Instant::now(),
        }
    }

    /// Consume a token if one is available.
    pub fn okay_to_send(&mut self) -> bool {
        self.okay_to_send_at(Instant::now())
    }

    /// [`okay_to_send`](Self::okay_to_send) against an explicit clock reading.
    pub fn okay_to_send_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        let earned = elapsed.as_secs_f64() / self.refill_interval.as_secs_f64();
        self.tokens = (self.tokens + earned).min(self.capacity);
        self.last_refill = now;
    }
}
