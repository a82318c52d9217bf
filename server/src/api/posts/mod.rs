pub mod get;
pub mod list;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/posts endpoints (mounted at /api/posts)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_posts))
        .route("/{slug}", get(get::get_post))
}

#[derive(OpenApi)]
#[openapi(
    paths(list::list_posts, get::get_post),
    components(schemas(list::ListPostsResponse, list::AppliedPostFilters))
)]
pub struct ApiDoc;
