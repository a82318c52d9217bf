use crate::api::{internal_error, not_found, ErrorResponse, RecipeResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use galley_core::Visibility;

#[utoipa::path(
    get,
    path = "/api/recipes/{slug}",
    tag = "recipes",
    params(
        ("slug" = String, Path, description = "Recipe slug")
    ),
    responses(
        (status = 200, description = "Recipe details", body = RecipeResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
pub async fn get_recipe(State(state): State<AppState>, Path(slug): Path<String>) -> impl IntoResponse {
    match state.store.recipe_by_slug(&slug, Visibility::Published).await {
        Ok(Some(recipe)) => (StatusCode::OK, Json(RecipeResponse::from(recipe))).into_response(),
        Ok(None) => not_found("Recipe not found"),
        Err(e) => {
            tracing::error!("Failed to fetch recipe {}: {}", slug, e);
            internal_error("Failed to fetch recipe")
        }
    }
}
