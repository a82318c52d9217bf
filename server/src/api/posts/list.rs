use crate::api::{internal_error, ErrorResponse, ListingParams, PaginationMetadata, PostResponse};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use galley_core::query::post_listing;
use galley_core::{PostCriteria, RawListingParams};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedPostFilters {
    pub q: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub sort: String,
}

impl From<&PostCriteria> for AppliedPostFilters {
    fn from(criteria: &PostCriteria) -> Self {
        Self {
            q: criteria.query.clone(),
            category: criteria.category.clone(),
            tags: criteria.tags.clone(),
            sort: criteria.sort.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListPostsResponse {
    pub posts: Vec<PostResponse>,
    pub pagination: PaginationMetadata,
    pub filters: AppliedPostFilters,
}

#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    params(ListingParams),
    responses(
        (status = 200, description = "One page of published posts", body = ListPostsResponse),
        (status = 500, description = "Listing failed", body = ErrorResponse)
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> impl IntoResponse {
    let criteria = PostCriteria::from_raw(&RawListingParams::from(params));
    let query = post_listing(&criteria);

    let page = match state.store.list_posts(&query).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!("Failed to list posts: {}", e);
            return internal_error("Failed to fetch posts");
        }
    };

    let pagination = PaginationMetadata::of(&page);
    (
        StatusCode::OK,
        Json(ListPostsResponse {
            posts: page.items.into_iter().map(PostResponse::from).collect(),
            pagination,
            filters: AppliedPostFilters::from(&criteria),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{get_json, seeded_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_drafts_are_hidden() {
        let state = seeded_state().await;
        let (status, body) = get_json(state, "/api/posts").await;

        assert_eq!(status, StatusCode::OK);
        let posts = body["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["title"], "Hello World");
        assert_eq!(posts[0]["status"], "published");
    }

    #[tokio::test]
    async fn test_search_matches_excerpt() {
        let state = seeded_state().await;
        let (_, body) = get_json(state.clone(), "/api/posts?q=FIRST").await;
        assert_eq!(body["posts"].as_array().unwrap().len(), 1);

        let (_, body) = get_json(state, "/api/posts?q=nothing-like-this").await;
        assert!(body["posts"].as_array().unwrap().is_empty());
        assert_eq!(body["pagination"]["total_pages"], 0);
    }
}
