// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-window request rate limiter keyed by (origin, action).
//!
//! Each key owns a one-second window with a request counter. The counter is
//! checked and bumped while holding the key's map shard, so concurrent callers
//! sharing a key cannot both take the last slot.
//!
//! Expired windows are evicted once the number of calls since the previous
//! cleanup reaches `max(cleanup_interval, tracked keys)`, which keeps the
//! eviction cost O(1) amortized per call and memory bounded by the number of
//! origins active within the last window.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Length of a rate-limit window.
pub const WINDOW: Duration = Duration::from_secs(1);

/// Minimum number of calls between two eviction passes.
const DEFAULT_CLEANUP_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RateKey {
    origin: String,
    action: String,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-(origin, action) request limiter. Shared across all request tasks.
pub struct RateLimiter {
    windows: DashMap<RateKey, Window>,
    calls_since_cleanup: AtomicU64,
    cleanup_interval: u64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_cleanup_interval(DEFAULT_CLEANUP_INTERVAL)
    }

    pub fn with_cleanup_interval(cleanup_interval: u64) -> Self {
        Self {
            windows: DashMap::new(),
            calls_since_cleanup: AtomicU64::new(0),
            cleanup_interval: cleanup_interval.max(1),
        }
    }

    /// Admit or deny one request for `(origin, action)`.
    pub fn allow(&self, origin: &str, action: &str, max_per_second: u32) -> bool {
        self.allow_at(origin, action, max_per_second, Instant::now())
    }

    /// Same as [`allow`](Self::allow) with an explicit clock reading.
    pub fn allow_at(&self, origin: &str, action: &str, max_per_second: u32, now: Instant) -> bool {
        let key = RateKey {
            origin: origin.to_string(),
            action: action.to_string(),
        };

        // The shard guard must be released before eviction touches the map.
        let allowed = {
            let mut window = self.windows.entry(key).or_insert(Window {
                started: now,
                count: 0,
            });

            if now.saturating_duration_since(window.started) >= WINDOW {
                window.started = now;
                window.count = 0;
            }

            if window.count >= max_per_second {
                false
            } else {
                window.count += 1;
                true
            }
        };

        if !allowed {
            tracing::warn!(origin, action, max_per_second, "Rate limit exceeded");
        }

        self.maybe_evict(now);
        allowed
    }

    /// Number of (origin, action) keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop every window that has fully elapsed at `now`.
    pub fn evict_expired(&self, now: Instant) {
        self.windows
            .retain(|_, window| now.saturating_duration_since(window.started) < WINDOW);
    }

    fn maybe_evict(&self, now: Instant) {
        let calls = self.calls_since_cleanup.fetch_add(1, Ordering::Relaxed) + 1;
        if calls < self.cleanup_interval {
            return;
        }

        let threshold = self.cleanup_interval.max(self.windows.len() as u64);
        if calls < threshold {
            return;
        }

        // Only one caller wins the reset and runs the pass.
        if self
            .calls_since_cleanup
            .compare_exchange(calls, 0, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let before = self.windows.len();
            self.evict_expired(now);
            tracing::debug!(
                before,
                after = self.windows.len(),
                "Evicted expired rate-limit windows"
            );
        }
    }
}
