use crate::api::admin::parse_id;
use crate::api::{
    content_error_response, internal_error, mutation_error, ErrorResponse, ListingParams,
    MutationResponse, PaginationMetadata, PostResponse,
};
use crate::auth::AdminUser;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use galley_core::content::{create_post as create_post_draft, publish_post as publish_draft};
use galley_core::query::admin_post_listing;
use galley_core::{PostCriteria, PostDraft, RawListingParams};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminPostsResponse {
    pub posts: Vec<PostResponse>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreatePostRequest {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    /// Defaults to "general"
    pub category: String,
    pub featured: bool,
    /// Publish immediately instead of saving a draft
    pub publish: bool,
    pub tags: Vec<String>,
}

impl From<CreatePostRequest> for PostDraft {
    fn from(request: CreatePostRequest) -> Self {
        PostDraft {
            title: request.title,
            excerpt: request.excerpt,
            content: request.content,
            category: request.category,
            featured: request.featured,
            publish: request.publish,
            tags: request.tags,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/posts",
    tag = "admin",
    params(ListingParams),
    responses(
        (status = 200, description = "One page of posts, drafts included", body = AdminPostsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_posts(
    AdminUser(_user): AdminUser,
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> impl IntoResponse {
    let criteria = PostCriteria::from_raw(&RawListingParams::from(params));
    let page = match state.store.list_posts(&admin_post_listing(&criteria)).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!("Failed to list posts: {}", e);
            return internal_error("Failed to fetch posts");
        }
    };

    let pagination = PaginationMetadata::of(&page);
    (
        StatusCode::OK,
        Json(AdminPostsResponse {
            posts: page.items.into_iter().map(PostResponse::from).collect(),
            pagination,
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/posts",
    tag = "admin",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = MutationResponse<PostResponse>),
        (status = 422, description = "Invalid title or tag names"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_post(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> impl IntoResponse {
    let has_tags = !request.tags.is_empty();
    match create_post_draft(state.store.as_ref(), &state.tags, request.into(), user.id).await {
        Ok(post) => {
            if has_tags {
                state.listings.invalidate_tags();
            }
            MutationResponse::ok(StatusCode::CREATED, PostResponse::from(post))
        }
        Err(e) => content_error_response(e, "Post not found", "Failed to create post"),
    }
}

/// Draft → published. Publishing twice is harmless and keeps the original
/// publication date.
#[utoipa::path(
    post,
    path = "/api/admin/posts/{id}/publish",
    tag = "admin",
    params(
        ("id" = String, Path, description = "Post ID (UUID)")
    ),
    responses(
        (status = 200, description = "Post is published", body = MutationResponse<PostResponse>),
        (status = 404, description = "Post not found"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn publish_post(
    AdminUser(_user): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(id) = parse_id(&id) else {
        return mutation_error(StatusCode::NOT_FOUND, "Post not found");
    };

    match publish_draft(state.store.as_ref(), id).await {
        Ok(post) => {
            // Usage counts include the newly published post
            state.listings.invalidate_tags();
            MutationResponse::ok(StatusCode::OK, PostResponse::from(post))
        }
        Err(e) => content_error_response(e, "Post not found", "Failed to publish post"),
    }
}
