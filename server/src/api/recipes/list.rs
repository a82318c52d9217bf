use crate::api::{internal_error, ErrorResponse, ListingParams, PaginationMetadata, RecipeResponse};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use galley_core::query::recipe_listing;
use galley_core::{RawListingParams, RecipeCriteria, ViewMode};
use serde::Serialize;
use utoipa::ToSchema;

/// The criteria actually applied after normalization, so the caller can
/// render its filter controls from them.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRecipeFilters {
    pub q: Option<String>,
    pub category: String,
    pub difficulty: String,
    pub max_time: u32,
    pub servings: u32,
    pub tags: Vec<String>,
    pub sort: String,
    pub view: String,
}

impl From<&RecipeCriteria> for AppliedRecipeFilters {
    fn from(criteria: &RecipeCriteria) -> Self {
        Self {
            q: criteria.query.clone(),
            category: criteria.category.clone(),
            difficulty: criteria.difficulty.clone(),
            max_time: criteria.max_time,
            servings: criteria.servings,
            tags: criteria.tags.clone(),
            sort: criteria.sort.as_str().to_string(),
            view: match criteria.view {
                ViewMode::Grid => "grid".to_string(),
                ViewMode::List => "list".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeResponse>,
    pub pagination: PaginationMetadata,
    pub filters: AppliedRecipeFilters,
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListingParams),
    responses(
        (status = 200, description = "One page of published recipes", body = ListRecipesResponse),
        (status = 500, description = "Listing failed", body = ErrorResponse)
    )
)]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> impl IntoResponse {
    let criteria = RecipeCriteria::from_raw(&RawListingParams::from(params));
    let query = recipe_listing(&criteria);

    let page = match state.store.list_recipes(&query).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!("Failed to list recipes: {}", e);
            return internal_error("Failed to fetch recipes");
        }
    };

    let pagination = PaginationMetadata::of(&page);
    (
        StatusCode::OK,
        Json(ListRecipesResponse {
            recipes: page.items.into_iter().map(RecipeResponse::from).collect(),
            pagination,
            filters: AppliedRecipeFilters::from(&criteria),
        }),
    )
        .into_response()
}
