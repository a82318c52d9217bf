//! Fixed-window request counting.
//!
//! Time is cut into non-overlapping windows of `window` length. Each caller
//! key gets one counter per window; the counter is created on first hit and
//! dropped by a periodic sweep once its window has passed. State is local to
//! the process and lost on restart; plug a shared [`WindowStore`] in when
//! several instances must agree.

mod store;

pub use store::{MemoryWindowStore, RateLimitWindow, WindowStore};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis())
            .unwrap_or(i64::MAX)
            .max(1)
    }
}

/// Outcome of a single hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix milliseconds at which the current window ends.
    pub reset_at_ms: i64,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let wait_ms = (self.reset_at_ms - now_ms).max(0);
        u64::try_from((wait_ms + 999) / 1000).unwrap_or(0)
    }
}

pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    store: Arc<dyn WindowStore>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig, store: Arc<dyn WindowStore>) -> Self {
        Self { config, store }
    }

    /// Limiter backed by a fresh in-process store.
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(config, Arc::new(MemoryWindowStore::new()))
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a hit for `key` now.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Utc::now().timestamp_millis()).await
    }

    /// Count a hit for `key` at `now_ms` (Unix milliseconds).
    pub async fn check_at(&self, key: &str, now_ms: i64) -> RateLimitDecision {
        let window_ms = self.config.window_ms();
        let index = now_ms.div_euclid(window_ms);
        let reset_at_ms = (index + 1) * window_ms;

        let window = self
            .store
            .increment(&format!("{}:{}", key, index), reset_at_ms)
            .await;

        let limit = self.config.max_requests;
        let allowed = window.count <= limit;
        if !allowed {
            tracing::debug!(key, count = window.count, limit, "rate limit exceeded");
        }

        RateLimitDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(window.count),
            reset_at_ms: window.reset_at_ms,
        }
    }

    /// Drop windows whose reset time is strictly before `now_ms`.
    pub async fn sweep_at(&self, now_ms: i64) -> usize {
        self.store.sweep(now_ms).await
    }

    /// Run the sweep on a timer until the returned task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = limiter.sweep_at(Utc::now().timestamp_millis()).await;
                if removed > 0 {
                    tracing::debug!(removed, "swept expired rate limit windows");
                }
            }
        })
    }
}
