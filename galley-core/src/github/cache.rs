use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::{CommitError, CommitLookup, CommitSource, RepoRef};

/// How long a commit (or an empty result) is reused.
pub const SUCCESS_TTL: Duration = Duration::from_secs(60 * 60);
/// How long a failure is replayed before GitHub is asked again.
pub const ERROR_TTL: Duration = Duration::from_secs(5 * 60);
/// Upper bound on remembered repositories; past it new results are not kept.
pub const MAX_ENTRIES: usize = 1_000;

struct CacheEntry {
    result: Result<CommitLookup, CommitError>,
    expires_at: Instant,
}

/// Wraps any [`CommitSource`] with an in-memory cache of recent results.
/// Failures are cached too, on a shorter lifetime, so a struggling upstream
/// is not hammered by retries.
pub struct CachingCommitSource {
    inner: Arc<dyn CommitSource>,
    entries: DashMap<String, CacheEntry>,
    success_ttl: Duration,
    error_ttl: Duration,
}

impl CachingCommitSource {
    pub fn new(inner: Arc<dyn CommitSource>) -> Self {
        Self::with_ttls(inner, SUCCESS_TTL, ERROR_TTL)
    }

    pub fn with_ttls(inner: Arc<dyn CommitSource>, success_ttl: Duration, error_ttl: Duration) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            success_ttl,
            error_ttl,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn remember(&self, key: String, result: Result<CommitLookup, CommitError>, ttl: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        if self.entries.len() >= MAX_ENTRIES && !self.entries.contains_key(&key) {
            tracing::warn!(key = %key, "commit cache full, not caching");
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                result,
                expires_at: now + ttl,
            },
        );
    }

    fn cached(&self, key: &str) -> Option<Result<CommitLookup, CommitError>> {
        let entry = self.entries.get(key)?;
        if entry.expires_at > Instant::now() {
            tracing::debug!(key, "commit cache hit");
            Some(entry.result.clone())
        } else {
            None
        }
    }
}

#[async_trait]
impl CommitSource for CachingCommitSource {
    async fn last_commit(&self, repo: &RepoRef) -> Result<CommitLookup, CommitError> {
        let key = repo.cache_key();
        if let Some(result) = self.cached(&key) {
            return result;
        }

        let result = self.inner.last_commit(repo).await;
        let ttl = if result.is_ok() {
            self.success_ttl
        } else {
            self.error_ttl
        };
        self.remember(key, result.clone(), ttl);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::FakeCommitSource;

    fn repo() -> RepoRef {
        RepoRef::new("octo", "site", "main")
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_reused_for_an_hour() {
        let fake = Arc::new(FakeCommitSource::with_commit(FakeCommitSource::sample_commit()));
        let cache = CachingCommitSource::new(fake.clone());

        cache.last_commit(&repo()).await.unwrap();
        cache.last_commit(&repo()).await.unwrap();
        assert_eq!(fake.calls(), 1);

        tokio::time::advance(SUCCESS_TTL + Duration::from_secs(1)).await;
        cache.last_commit(&repo()).await.unwrap();
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_expire_sooner() {
        let fake = Arc::new(FakeCommitSource::failing(CommitError::Request(
            "connection reset".to_string(),
        )));
        let cache = CachingCommitSource::new(fake.clone());

        assert!(cache.last_commit(&repo()).await.is_err());
        assert!(cache.last_commit(&repo()).await.is_err());
        assert_eq!(fake.calls(), 1);

        tokio::time::advance(ERROR_TTL + Duration::from_secs(1)).await;
        assert!(cache.last_commit(&repo()).await.is_err());
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_purged() {
        let fake = Arc::new(FakeCommitSource::with_commit(FakeCommitSource::sample_commit()));
        let cache = CachingCommitSource::new(fake.clone());

        for n in 0..10 {
            cache
                .last_commit(&RepoRef::new(format!("owner{}", n), "site", "main"))
                .await
                .unwrap();
        }
        assert_eq!(cache.entry_count(), 10);

        tokio::time::advance(SUCCESS_TTL + Duration::from_secs(1)).await;
        cache.last_commit(&repo()).await.unwrap();
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_count_is_bounded() {
        let fake = Arc::new(FakeCommitSource::with_commit(FakeCommitSource::sample_commit()));
        let cache = CachingCommitSource::new(fake.clone());

        for n in 0..MAX_ENTRIES + 50 {
            cache
                .last_commit(&RepoRef::new(format!("owner{}", n), "site", "main"))
                .await
                .unwrap();
        }
        assert_eq!(cache.entry_count(), MAX_ENTRIES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_branches_cached_separately() {
        let fake = Arc::new(FakeCommitSource::with_commit(FakeCommitSource::sample_commit()));
        let cache = CachingCommitSource::new(fake.clone());

        cache.last_commit(&repo()).await.unwrap();
        cache
            .last_commit(&RepoRef::new("octo", "site", "dev"))
            .await
            .unwrap();
        assert_eq!(fake.calls(), 2);
    }
}
