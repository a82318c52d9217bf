//! "Last commit" metadata from the GitHub REST API.
//!
//! [`GithubClient`] talks to the API, [`CachingCommitSource`] keeps results
//! (and failures) around briefly so repeated page loads do not hit GitHub,
//! and [`FakeCommitSource`] scripts responses for tests.

mod cache;
mod client;
mod fake;

pub use cache::CachingCommitSource;
pub use client::GithubClient;
pub use fake::FakeCommitSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::ValidationError;

/// Repository branch to look up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// Validate caller-supplied names before they reach a URL or a cache key.
    /// Owner and repo allow `[A-Za-z0-9._-]`; the branch additionally allows
    /// `/` but no empty or dot-only path segments.
    pub fn parse(owner: &str, repo: &str, branch: &str) -> Result<Self, ValidationError> {
        let owner = owner.trim();
        let repo = repo.trim();
        let branch = branch.trim();
        if !is_repo_name(owner) {
            return Err(ValidationError::new("owner", "Invalid repository owner"));
        }
        if !is_repo_name(repo) {
            return Err(ValidationError::new("repo", "Invalid repository name"));
        }
        if branch.len() > MAX_BRANCH_LEN || !branch.split('/').all(is_repo_name) {
            return Err(ValidationError::new("branch", "Invalid branch name"));
        }
        Ok(Self::new(owner, repo, branch))
    }

    pub fn cache_key(&self) -> String {
        format!("{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

const MAX_NAME_LEN: usize = 100;
const MAX_BRANCH_LEN: usize = 255;

fn is_repo_name(part: &str) -> bool {
    !part.is_empty()
        && part.len() <= MAX_NAME_LEN
        && !part.chars().all(|c| c == '.')
        && !part.starts_with('-')
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Upstream quota as reported by GitHub's `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds.
    pub reset: i64,
    pub used: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitAuthor {
    pub name: String,
    pub login: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author: CommitAuthor,
    pub date: DateTime<Utc>,
    pub url: String,
}

impl CommitInfo {
    /// Human-readable date, e.g. "March 5, 2025".
    pub fn formatted_date(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }
}

/// A successful lookup. `commit` is `None` when the branch has no commits or
/// the repository does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLookup {
    pub commit: Option<CommitInfo>,
    pub ratelimit: Option<RateLimitInfo>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("GitHub API returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        ratelimit: Option<RateLimitInfo>,
    },

    #[error("GitHub request failed: {0}")]
    Request(String),

    #[error("Unexpected GitHub response: {0}")]
    Parse(String),

    #[error("GitHub lookups throttled until {reset_at_ms}")]
    Throttled { reset_at_ms: i64 },
}

impl CommitError {
    pub fn ratelimit(&self) -> Option<RateLimitInfo> {
        match self {
            CommitError::Api { ratelimit, .. } => *ratelimit,
            _ => None,
        }
    }
}

#[async_trait]
pub trait CommitSource: Send + Sync {
    async fn last_commit(&self, repo: &RepoRef) -> Result<CommitLookup, CommitError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_formatted_date() {
        let commit = CommitInfo {
            sha: "abc".to_string(),
            message: "fix".to_string(),
            author: CommitAuthor {
                name: "Ada".to_string(),
                login: None,
                avatar_url: None,
            },
            date: Utc.with_ymd_and_hms(2025, 3, 5, 14, 0, 0).unwrap(),
            url: "https://github.com/o/r/commit/abc".to_string(),
        };
        assert_eq!(commit.formatted_date(), "March 5, 2025");
    }

    #[test]
    fn test_parse_accepts_real_names() {
        let repo = RepoRef::parse("rust-lang", "rust.vim", "release/1.85_fix").unwrap();
        assert_eq!(repo.cache_key(), "rust-lang/rust.vim@release/1.85_fix");
    }

    #[test]
    fn test_parse_rejects_path_tricks() {
        for (owner, repo, branch, field) in [
            ("..", "r", "main", "owner"),
            ("o/../x", "r", "main", "owner"),
            ("o", "r?per_page=100", "main", "repo"),
            ("o", "", "main", "repo"),
            ("o", "r", "a//b", "branch"),
            ("o", "r", "../main", "branch"),
            ("o", "r", "main#x", "branch"),
        ] {
            let err = RepoRef::parse(owner, repo, branch).unwrap_err();
            assert_eq!(err.field, field, "{}/{}@{}", owner, repo, branch);
        }
        assert!(RepoRef::parse(&"a".repeat(101), "r", "main").is_err());
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(RepoRef::new("o", "r", "main").cache_key(), "o/r@main");
    }
}
