use axum::extract::FromRef;
use galley_core::github::{CommitSource, RepoRef};
use galley_core::{ContentStore, FixedWindowLimiter, IdentityProvider, TagRegistry};
use std::sync::Arc;

use crate::cache::ListingCache;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub tags: Arc<TagRegistry>,
    pub identity: Arc<dyn IdentityProvider>,
    pub commits: Arc<dyn CommitSource>,
    /// Repository used when the last-commit request names none.
    pub github_repo: RepoRef,
    /// Per-client limiter for the public proxy routes.
    pub api_limiter: Arc<FixedWindowLimiter>,
    /// Key the limiter on `X-Forwarded-For` instead of the peer address.
    pub trust_forwarded_for: bool,
    pub listings: Arc<ListingCache>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ContentStore>,
        identity: Arc<dyn IdentityProvider>,
        commits: Arc<dyn CommitSource>,
        github_repo: RepoRef,
        api_limiter: Arc<FixedWindowLimiter>,
    ) -> Self {
        Self {
            tags: Arc::new(TagRegistry::new(store.clone())),
            store,
            identity,
            commits,
            github_repo,
            api_limiter,
            trust_forwarded_for: false,
            listings: Arc::new(ListingCache::new()),
        }
    }

    pub fn with_trusted_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}

impl FromRef<AppState> for Arc<dyn IdentityProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.identity.clone()
    }
}
