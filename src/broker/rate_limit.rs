// =============================================================================
// Rate-Limit Tracker — follows the broker's per-minute request budget
// =============================================================================
//
// Alpaca reports its budget on every response:
//   X-Ratelimit-Limit      requests allowed per minute
//   X-Ratelimit-Remaining  requests left in the current window
//
// The bot makes a handful of calls every few hours, so the tracker only warns;
// it never blocks a request.
// =============================================================================

use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;
use tracing::{debug, warn};

/// Warn once remaining requests drop under this share of the limit.
const LOW_WATERMARK_PCT: u32 = 10;

#[derive(Debug, Default)]
pub struct RateLimitTracker {
    limit: AtomicU32,
    remaining: AtomicU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    pub remaining: u32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update counters from response headers. Missing or garbled headers
    /// leave the previous values in place.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u32>().ok())
        };

        if let Some(limit) = read("x-ratelimit-limit") {
            self.limit.store(limit, Ordering::Relaxed);
        }
        if let Some(remaining) = read("x-ratelimit-remaining") {
            self.remaining.store(remaining, Ordering::Relaxed);
            let limit = self.limit.load(Ordering::Relaxed);
            if self.is_low() {
                warn!(remaining, limit, "broker rate-limit budget running low");
            } else {
                debug!(remaining, limit, "broker rate-limit budget updated");
            }
        }
    }

    /// True when a limit is known and remaining requests are under the
    /// low watermark.
    pub fn is_low(&self) -> bool {
        let snap = self.snapshot();
        snap.limit > 0
            && u64::from(snap.remaining) * 100 < u64::from(snap.limit) * u64::from(LOW_WATERMARK_PCT)
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            limit: self.limit.load(Ordering::Relaxed),
            remaining: self.remaining.load(Ordering::Relaxed),
        }
    }
}
