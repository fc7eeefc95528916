//! Retry policy with exponential backoff
//!
//! Delays double from a base value and stop growing at a cap, so the
//! sequence is non-decreasing and the total wait is bounded by
//! `max_retries * max_delay`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of additional attempts after the first
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (1 second)
pub const BASE_DELAY_MS: u64 = 1000;

/// Maximum delay cap (16 seconds)
pub const MAX_DELAY_MS: u64 = 16000;

/// Backoff settings for retried pulls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay_ms: u64,

    /// Ceiling on any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
        }
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        let delay_ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Upper bound on the time spent sleeping across all retries
    pub fn max_total_wait_time(&self) -> Duration {
        (1..=self.max_retries).map(|r| self.delay_for(r)).sum()
    }
}
