//! Fixed-window rate limiter for abuse-prone endpoints
//!
//! Each key gets a counter and a window end time. The first request opens a
//! window; requests inside it are counted until the limit is hit; the first
//! request at or after the window end opens a new one. A client can therefore
//! send up to twice the limit across a window boundary.
//!
//! State lives in process memory and is not shared between instances.
//! Expired entries are swept lazily from `check`, at most once every
//! [`CLEANUP_INTERVAL_SECS`].

use chrono::{DateTime, Duration, Utc};
use common::clock::SharedClock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Minimum time between two sweeps of expired entries
pub const CLEANUP_INTERVAL_SECS: i64 = 5 * 60;

/// Key used when the caller cannot be identified; all such callers share it
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Per-key window state
#[derive(Debug)]
struct RateLimitEntry {
    /// Requests counted in the current window
    count: u32,
    /// End of the current window
    reset_at: DateTime<Utc>,
}

#[derive(Debug)]
struct LimiterState {
    entries: HashMap<String, RateLimitEntry>,
    last_cleanup: DateTime<Utc>,
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests still available in the current window
    pub remaining: u32,
    /// Time until the current window ends
    pub reset_in: std::time::Duration,
}

impl RateLimitDecision {
    /// Whole seconds until the window ends, rounded up and at least 1
    pub fn retry_after_secs(&self) -> u64 {
        let millis = self.reset_in.as_millis() as u64;
        millis.div_ceil(1000).max(1)
    }
}

/// Quota for one scope of requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    clock: SharedClock,
    state: Arc<Mutex<LimiterState>>,
}

impl RateLimiter {
    /// Create a new rate limiter on the given clock
    pub fn with_clock(clock: SharedClock) -> Self {
        let now = clock.now();
        Self {
            clock,
            state: Arc::new(Mutex::new(LimiterState {
                entries: HashMap::new(),
                last_cleanup: now,
            })),
        }
    }

    /// Count a request for `key` against `max_requests` per `window`
    pub async fn check(&self, key: &str, max_requests: u32, window: Duration) -> RateLimitDecision {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        if now - state.last_cleanup >= Duration::seconds(CLEANUP_INTERVAL_SECS) {
            let before = state.entries.len();
            state.entries.retain(|_, entry| now < entry.reset_at);
            state.last_cleanup = now;
            debug!(
                "Rate limiter swept {} expired entries",
                before - state.entries.len()
            );
        }

        if let Some(entry) = state
            .entries
            .get_mut(key)
            .filter(|entry| now < entry.reset_at)
        {
            let reset_in = to_std(entry.reset_at - now);

            if entry.count >= max_requests {
                info!("Rate limit exceeded for key {}", key);
                return RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_in,
                };
            }

            entry.count += 1;
            return RateLimitDecision {
                allowed: true,
                remaining: max_requests - entry.count,
                reset_in,
            };
        }

        // Saturate instead of overflowing for absurdly long windows
        let reset_at = now
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        state.entries.insert(
            key.to_string(),
            RateLimitEntry {
                count: 1,
                reset_at,
            },
        );
        RateLimitDecision {
            allowed: true,
            remaining: max_requests.saturating_sub(1),
            reset_in: to_std(reset_at - now),
        }
    }

    /// Number of keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

fn to_std(duration: Duration) -> std::time::Duration {
    duration.to_std().unwrap_or_default()
}
