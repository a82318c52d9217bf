use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{CommitAuthor, CommitError, CommitInfo, CommitLookup, CommitSource, RepoRef};

/// Scripted [`CommitSource`] that counts how often it is asked.
#[derive(Debug)]
pub struct FakeCommitSource {
    result: Result<CommitLookup, CommitError>,
    calls: AtomicUsize,
}

impl FakeCommitSource {
    pub fn new(result: Result<CommitLookup, CommitError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_commit(commit: CommitInfo) -> Self {
        Self::new(Ok(CommitLookup {
            commit: Some(commit),
            ratelimit: None,
        }))
    }

    pub fn empty() -> Self {
        Self::new(Ok(CommitLookup {
            commit: None,
            ratelimit: None,
        }))
    }

    pub fn failing(error: CommitError) -> Self {
        Self::new(Err(error))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sample_commit() -> CommitInfo {
        CommitInfo {
            sha: "4f2c1d9".to_string(),
            message: "Tidy up recipe filters".to_string(),
            author: CommitAuthor {
                name: "Octo Cat".to_string(),
                login: Some("octocat".to_string()),
                avatar_url: Some("https://avatars.githubusercontent.com/u/583231".to_string()),
            },
            date: Utc
                .with_ymd_and_hms(2025, 3, 5, 14, 0, 0)
                .single()
                .unwrap_or_default(),
            url: "https://github.com/octocat/site/commit/4f2c1d9".to_string(),
        }
    }
}

#[async_trait]
impl CommitSource for FakeCommitSource {
    async fn last_commit(&self, _repo: &RepoRef) -> Result<CommitLookup, CommitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
