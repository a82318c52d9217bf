use crate::api::{
    content_error_response, internal_error, ErrorResponse, ListingParams, MutationResponse,
    PaginationMetadata, RecipeResponse,
};
use crate::auth::AdminUser;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use galley_core::content::create_recipe as create_recipe_draft;
use galley_core::query::admin_recipe_listing;
use galley_core::{RawListingParams, RecipeCriteria, RecipeDraft};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminRecipesResponse {
    pub recipes: Vec<RecipeResponse>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub description: String,
    /// Defaults to "uncategorized"
    pub category: String,
    pub cuisine: Option<String>,
    /// Defaults to "medium"
    pub difficulty: String,
    pub servings: i32,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub published: bool,
    pub featured: bool,
    /// Tag names; unknown tags are created
    pub tags: Vec<String>,
}

impl From<CreateRecipeRequest> for RecipeDraft {
    fn from(request: CreateRecipeRequest) -> Self {
        RecipeDraft {
            title: request.title,
            description: request.description,
            category: request.category,
            cuisine: request.cuisine,
            difficulty: request.difficulty,
            servings: request.servings,
            prep_time_minutes: request.prep_time_minutes,
            cook_time_minutes: request.cook_time_minutes,
            published: request.published,
            featured: request.featured,
            tags: request.tags,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/recipes",
    tag = "admin",
    params(ListingParams),
    responses(
        (status = 200, description = "One page of recipes, drafts included", body = AdminRecipesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AdminUser(_user): AdminUser,
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> impl IntoResponse {
    let criteria = RecipeCriteria::from_raw(&RawListingParams::from(params));
    let page = match state.store.list_recipes(&admin_recipe_listing(&criteria)).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!("Failed to list recipes: {}", e);
            return internal_error("Failed to fetch recipes");
        }
    };

    let pagination = PaginationMetadata::of(&page);
    (
        StatusCode::OK,
        Json(AdminRecipesResponse {
            recipes: page.items.into_iter().map(RecipeResponse::from).collect(),
            pagination,
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/recipes",
    tag = "admin",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = MutationResponse<RecipeResponse>),
        (status = 422, description = "Invalid title, numbers or tag names"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
    Json(request): Json<CreateRecipeRequest>,
) -> impl IntoResponse {
    let has_tags = !request.tags.is_empty();
    match create_recipe_draft(state.store.as_ref(), &state.tags, request.into(), user.id).await {
        Ok(recipe) => {
            if has_tags {
                state.listings.invalidate_tags();
            }
            MutationResponse::ok(StatusCode::CREATED, RecipeResponse::from(recipe))
        }
        Err(e) => content_error_response(e, "Recipe not found", "Failed to create recipe"),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{get_json_as, send_json, seeded_state, ADMIN_TOKEN};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_admin_listing_includes_drafts() {
        let state = seeded_state().await;
        let (status, body) = get_json_as(state, "/api/admin/recipes", ADMIN_TOKEN).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["page_size"], 25);
        let titles: Vec<&str> = body["recipes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["title"].as_str().unwrap())
            .collect();
        assert!(titles.contains(&"Secret Stew"));
    }

    #[tokio::test]
    async fn test_create_recipe_suffixes_duplicate_slug() {
        let state = seeded_state().await;
        let (status, body) = send_json(
            state,
            "/api/admin/recipes",
            json!({"title": "Lemon Tart", "published": true, "tags": ["Citrus"]}),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["slug"], "lemon-tart-2");
        assert_eq!(body["data"]["tags"][0]["slug"], "citrus");
    }

    #[tokio::test]
    async fn test_create_recipe_validates_title() {
        let state = seeded_state().await;
        let (status, body) = send_json(state, "/api/admin/recipes", json!({"title": "  "})).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("title:"));
    }
}
