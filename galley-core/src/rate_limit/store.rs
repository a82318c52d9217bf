use async_trait::async_trait;
use dashmap::DashMap;

/// Counter for one (key, window) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub count: u32,
    pub reset_at_ms: i64,
}

/// Backing storage for window counters.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Atomically create-or-increment the counter for `key`. A new window
    /// starts at count 1 with the given reset time; an existing one keeps its
    /// reset time.
    async fn increment(&self, key: &str, reset_at_ms: i64) -> RateLimitWindow;

    /// Remove windows whose reset time is strictly before `now_ms`; returns
    /// how many were removed.
    async fn sweep(&self, now_ms: i64) -> usize;

    async fn len(&self) -> usize;
}

/// Window counters in a sharded concurrent map. The entry API holds the shard
/// lock for the whole read-increment-write, and the sweep takes the same
/// locks, so a window is never removed between lookup and increment.
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
    windows: DashMap<String, RateLimitWindow>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn increment(&self, key: &str, reset_at_ms: i64) -> RateLimitWindow {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(RateLimitWindow {
                count: 0,
                reset_at_ms,
            });
        entry.count = entry.count.saturating_add(1);
        *entry
    }

    async fn sweep(&self, now_ms: i64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at_ms >= now_ms);
        before.saturating_sub(self.windows.len())
    }

    async fn len(&self) -> usize {
        self.windows.len()
    }
}
