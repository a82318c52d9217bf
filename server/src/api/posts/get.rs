use crate::api::{internal_error, not_found, ErrorResponse, PostResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use galley_core::content::view_post;

/// Fetch a published post. Each successful read counts as a view.
#[utoipa::path(
    get,
    path = "/api/posts/{slug}",
    tag = "posts",
    params(
        ("slug" = String, Path, description = "Post slug")
    ),
    responses(
        (status = 200, description = "Post details", body = PostResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn get_post(State(state): State<AppState>, Path(slug): Path<String>) -> impl IntoResponse {
    match view_post(state.store.as_ref(), &slug).await {
        Ok(Some(post)) => (StatusCode::OK, Json(PostResponse::from(post))).into_response(),
        Ok(None) => not_found("Post not found"),
        Err(e) => {
            tracing::error!("Failed to fetch post {}: {}", slug, e);
            internal_error("Failed to fetch post")
        }
    }
}
