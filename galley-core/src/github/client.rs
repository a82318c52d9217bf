use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::{
    CommitAuthor, CommitError, CommitInfo, CommitLookup, CommitSource, RateLimitInfo, RepoRef,
};
use crate::rate_limit::FixedWindowLimiter;

/// Limiter key shared by every outgoing GitHub call.
const LIMITER_KEY: &str = "github";

#[derive(Clone)]
pub struct GithubClientBuilder {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    user_agent: String,
    limiter: Option<Arc<FixedWindowLimiter>>,
}

impl Default for GithubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            token: None,
            timeout: Duration::from_secs(10),
            user_agent: "galley/0.1 (+https://github.com)".to_string(),
            limiter: None,
        }
    }

    /// Override the API root, e.g. for GitHub Enterprise.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Personal access token; raises the upstream quota.
    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Local budget checked before every outgoing call.
    pub fn limiter(mut self, limiter: Arc<FixedWindowLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn build(self) -> Result<GithubClient, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?;

        Ok(GithubClient {
            inner,
            base_url: self.base_url,
            token: self.token,
            limiter: self.limiter,
        })
    }
}

pub struct GithubClient {
    inner: reqwest::Client,
    base_url: String,
    token: Option<String>,
    limiter: Option<Arc<FixedWindowLimiter>>,
}

impl GithubClient {
    pub fn builder() -> GithubClientBuilder {
        GithubClientBuilder::new()
    }
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    html_url: String,
    commit: ApiCommitDetail,
    author: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    message: String,
    author: Option<ApiGitAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiGitAuthor {
    name: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
    avatar_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

impl ApiCommit {
    fn into_info(self) -> Result<CommitInfo, CommitError> {
        let git_author = self
            .commit
            .author
            .ok_or_else(|| CommitError::Parse(format!("commit {} has no author", self.sha)))?;

        Ok(CommitInfo {
            sha: self.sha,
            message: self.commit.message,
            author: CommitAuthor {
                name: git_author.name,
                login: self.author.as_ref().map(|u| u.login.clone()),
                avatar_url: self.author.map(|u| u.avatar_url),
            },
            date: git_author.date,
            url: self.html_url,
        })
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Read GitHub's quota headers; `None` unless limit and remaining are both
/// present.
fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let limit: u32 = header_number(headers, "x-ratelimit-limit")?;
    let remaining: u32 = header_number(headers, "x-ratelimit-remaining")?;
    Some(RateLimitInfo {
        limit,
        remaining,
        reset: header_number(headers, "x-ratelimit-reset").unwrap_or(0),
        used: header_number(headers, "x-ratelimit-used")
            .unwrap_or_else(|| limit.saturating_sub(remaining)),
    })
}

/// `{base}/repos/{owner}/{repo}/commits`, each name added as one escaped
/// path segment.
fn commits_url(base_url: &str, repo: &RepoRef) -> Result<Url, CommitError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| CommitError::Request(format!("invalid GitHub base URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| CommitError::Request("GitHub base URL cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(["repos", repo.owner.as_str(), repo.repo.as_str(), "commits"]);
    Ok(url)
}

#[async_trait]
impl CommitSource for GithubClient {
    async fn last_commit(&self, repo: &RepoRef) -> Result<CommitLookup, CommitError> {
        if let Some(limiter) = &self.limiter {
            let decision = limiter.check(LIMITER_KEY).await;
            if !decision.allowed {
                tracing::warn!(
                    reset_at_ms = decision.reset_at_ms,
                    "local GitHub budget exhausted"
                );
                return Err(CommitError::Throttled {
                    reset_at_ms: decision.reset_at_ms,
                });
            }
        }

        let url = commits_url(&self.base_url, repo)?;
        let mut request = self
            .inner
            .get(url.clone())
            .query(&[("sha", repo.branch.as_str()), ("per_page", "1")])
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "GitHub request failed");
            CommitError::Request(e.to_string())
        })?;

        let ratelimit = parse_rate_limit(response.headers());
        let status = response.status();

        // 404: unknown repo or branch, 409: empty repository
        if status == StatusCode::NOT_FOUND || status == StatusCode::CONFLICT {
            return Ok(CommitLookup {
                commit: None,
                ratelimit,
            });
        }

        if !status.is_success() {
            let message = match response.json::<ApiMessage>().await {
                Ok(body) => body.message,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string(),
            };
            tracing::warn!(status = status.as_u16(), message = %message, "GitHub API error");
            return Err(CommitError::Api {
                status: status.as_u16(),
                message,
                ratelimit,
            });
        }

        let commits: Vec<ApiCommit> = response
            .json()
            .await
            .map_err(|e| CommitError::Parse(e.to_string()))?;

        let commit = match commits.into_iter().next() {
            Some(c) => Some(c.into_info()?),
            None => None,
        };

        Ok(CommitLookup { commit, ratelimit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_commits_url_escapes_each_segment() {
        let repo = RepoRef::new("octo", "site", "main");
        let url = commits_url("https://api.github.com", &repo).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/octo/site/commits");

        let sneaky = RepoRef::new("a/..", "b?x=1", "main");
        let url = commits_url("https://ghe.example/api/v3", &sneaky).unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example/api/v3/repos/a%2F../b%3Fx=1/commits"
        );
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_parse_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("57"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1741183200"));

        let info = parse_rate_limit(&headers).unwrap();
        assert_eq!(info.limit, 60);
        assert_eq!(info.remaining, 57);
        assert_eq!(info.reset, 1_741_183_200);
        assert_eq!(info.used, 3);
    }

    #[test]
    fn test_parse_rate_limit_missing() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
        assert!(parse_rate_limit(&headers).is_none());
    }

    #[test]
    fn test_commit_from_api_json() {
        let body = r#"[{
            "sha": "4f2c1d",
            "html_url": "https://github.com/octo/site/commit/4f2c1d",
            "commit": {
                "message": "Add tag merge",
                "author": {"name": "Octo Cat", "email": "o@example.com", "date": "2025-03-05T14:00:00Z"}
            },
            "author": {"login": "octocat", "avatar_url": "https://avatars.example/u/1"}
        }]"#;
        let commits: Vec<ApiCommit> = serde_json::from_str(body).unwrap();
        let info = commits.into_iter().next().unwrap().into_info().unwrap();

        assert_eq!(info.sha, "4f2c1d");
        assert_eq!(info.author.login.as_deref(), Some("octocat"));
        assert_eq!(info.formatted_date(), "March 5, 2025");
    }

    #[test]
    fn test_commit_without_linked_account() {
        let body = r#"[{
            "sha": "aa",
            "html_url": "https://github.com/octo/site/commit/aa",
            "commit": {"message": "m", "author": {"name": "N", "date": "2024-12-31T23:59:59Z"}},
            "author": null
        }]"#;
        let commits: Vec<ApiCommit> = serde_json::from_str(body).unwrap();
        let info = commits.into_iter().next().unwrap().into_info().unwrap();
        assert_eq!(info.author.login, None);
        assert_eq!(info.author.avatar_url, None);
    }
}
