pub mod last_commit;

use crate::state::AppState;
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

/// Returns the router for /api/github endpoints (mounted at /api/github).
/// Browsers on other origins may read these, so CORS is wide open for GET.
pub fn router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/last-commit", get(last_commit::last_commit))
        .layer(cors)
}

#[derive(OpenApi)]
#[openapi(
    paths(last_commit::last_commit),
    components(schemas(
        last_commit::LastCommitResponse,
        last_commit::CommitAuthorResponse,
        last_commit::RateLimitResponse,
        last_commit::CommitErrorResponse,
    ))
)]
pub struct ApiDoc;
