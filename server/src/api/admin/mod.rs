//! Back-office endpoints. Every handler takes [`AdminUser`](crate::auth::AdminUser),
//! so the caller is authenticated and authorized before anything is looked up.

pub mod posts;
pub mod recipes;
pub mod tags;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;
use uuid::Uuid;

/// Returns the router for /api/admin endpoints (mounted at /api/admin)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/tags/bulk", post(tags::bulk_create_tags))
        .route("/tags/merge", post(tags::merge_tags))
        .route(
            "/tags/{id}",
            post(tags::update_tag).delete(tags::delete_tag),
        )
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{id}/publish", post(posts::publish_post))
}

/// Ids arrive as free text; anything unparseable is treated as absent.
pub(crate) fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        tags::list_tags,
        tags::create_tag,
        tags::bulk_create_tags,
        tags::update_tag,
        tags::delete_tag,
        tags::merge_tags,
        recipes::list_recipes,
        recipes::create_recipe,
        posts::list_posts,
        posts::create_post,
        posts::publish_post,
    ),
    components(schemas(
        tags::AdminTagsResponse,
        tags::CreateTagForm,
        tags::BulkCreateTagsForm,
        tags::UpdateTagForm,
        tags::MergeTagsForm,
        recipes::AdminRecipesResponse,
        recipes::CreateRecipeRequest,
        posts::AdminPostsResponse,
        posts::CreatePostRequest,
    ))
)]
pub struct ApiDoc;
