use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use galley_core::github::{CommitAuthor, CommitInfo, RateLimitInfo, RepoRef};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const CACHE_OK: &str = "public, max-age=3600";
const CACHE_ERROR: &str = "public, max-age=300";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LastCommitParams {
    /// Repository owner (defaults to GITHUB_OWNER)
    pub owner: Option<String>,
    /// Repository name (defaults to GITHUB_REPO)
    pub repo: Option<String>,
    /// Branch (defaults to GITHUB_BRANCH)
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommitAuthorResponse {
    pub name: String,
    pub login: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<CommitAuthor> for CommitAuthorResponse {
    fn from(author: CommitAuthor) -> Self {
        Self {
            name: author.name,
            login: author.login,
            avatar_url: author.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RateLimitResponse {
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds
    pub reset: i64,
    pub used: u32,
}

impl From<RateLimitInfo> for RateLimitResponse {
    fn from(info: RateLimitInfo) -> Self {
        Self {
            limit: info.limit,
            remaining: info.remaining,
            reset: info.reset,
            used: info.used,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LastCommitResponse {
    pub sha: String,
    pub message: String,
    pub author: CommitAuthorResponse,
    pub date: DateTime<Utc>,
    /// e.g. "March 5, 2025"
    #[serde(rename = "formattedDate")]
    pub formatted_date: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratelimit: Option<RateLimitResponse>,
}

impl LastCommitResponse {
    fn new(commit: CommitInfo, ratelimit: Option<RateLimitInfo>) -> Self {
        let formatted_date = commit.formatted_date();
        Self {
            sha: commit.sha,
            message: commit.message,
            author: commit.author.into(),
            date: commit.date,
            formatted_date,
            url: commit.url,
            ratelimit: ratelimit.map(RateLimitResponse::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommitErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratelimit: Option<RateLimitResponse>,
}

fn with_cache_control(mut response: Response, value: &'static str) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
    response
}

/// Latest commit on a branch, proxied from GitHub
#[utoipa::path(
    get,
    path = "/api/github/last-commit",
    tag = "github",
    params(LastCommitParams),
    responses(
        (status = 200, description = "Latest commit on the branch", body = LastCommitResponse),
        (status = 400, description = "Owner, repo or branch is not a valid GitHub name", body = CommitErrorResponse),
        (status = 404, description = "Branch has no commit data", body = CommitErrorResponse),
        (status = 429, description = "Too many requests from this client"),
        (status = 500, description = "GitHub lookup failed", body = CommitErrorResponse)
    )
)]
pub async fn last_commit(
    State(state): State<AppState>,
    Query(params): Query<LastCommitParams>,
) -> Response {
    let defaults = &state.github_repo;
    let repo = match RepoRef::parse(
        params.owner.as_deref().unwrap_or(&defaults.owner),
        params.repo.as_deref().unwrap_or(&defaults.repo),
        params.branch.as_deref().unwrap_or(&defaults.branch),
    ) {
        Ok(repo) => repo,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(CommitErrorResponse {
                    error: e.to_string(),
                    ratelimit: None,
                }),
            )
                .into_response();
        }
    };

    match state.commits.last_commit(&repo).await {
        Ok(lookup) => match lookup.commit {
            Some(commit) => with_cache_control(
                (
                    StatusCode::OK,
                    Json(LastCommitResponse::new(commit, lookup.ratelimit)),
                )
                    .into_response(),
                CACHE_OK,
            ),
            None => with_cache_control(
                (
                    StatusCode::NOT_FOUND,
                    Json(CommitErrorResponse {
                        error: "No commit data found".to_string(),
                        ratelimit: lookup.ratelimit.map(RateLimitResponse::from),
                    }),
                )
                    .into_response(),
                CACHE_ERROR,
            ),
        },
        Err(e) => {
            tracing::error!(repo = %repo.cache_key(), "Failed to fetch last commit: {}", e);
            with_cache_control(
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(CommitErrorResponse {
                        error: "Failed to fetch last commit".to_string(),
                        ratelimit: e.ratelimit().map(RateLimitResponse::from),
                    }),
                )
                    .into_response(),
                CACHE_ERROR,
            )
        }
    }
}
