pub mod admin;
pub mod github;
pub mod posts;
pub mod recipes;
pub mod tags;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::{DateTime, Utc};
use galley_core::{
    BlogPost, ContentError, Page, RawListingParams, Recipe, Tag, TagError, TagRef,
};
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::rate_limit::rate_limit;
use crate::state::AppState;

/// Shared error response used by read endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Envelope returned by every mutation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MutationResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> MutationResponse<T> {
    pub fn ok(status: StatusCode, data: T) -> Response {
        (
            status,
            Json(MutationResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

/// Failure envelope; `data` is always absent.
pub fn mutation_error(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(MutationResponse::<()> {
            success: false,
            data: None,
            error: Some(error.into()),
        }),
    )
        .into_response()
}

/// Map a tag registry failure to the mutation envelope. Storage errors are
/// logged and replaced with `fallback`.
pub fn tag_error_response(err: TagError, fallback: &str) -> Response {
    match err {
        TagError::Validation(e) => mutation_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        TagError::NotFound => mutation_error(StatusCode::NOT_FOUND, "Tag not found"),
        TagError::Store(e) => {
            tracing::error!("{}: {}", fallback, e);
            mutation_error(StatusCode::INTERNAL_SERVER_ERROR, fallback)
        }
    }
}

pub fn content_error_response(err: ContentError, not_found: &str, fallback: &str) -> Response {
    match err {
        ContentError::Validation(e) => {
            mutation_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        ContentError::NotFound => mutation_error(StatusCode::NOT_FOUND, not_found),
        ContentError::Store(e) => {
            tracing::error!("{}: {}", fallback, e);
            mutation_error(StatusCode::INTERNAL_SERVER_ERROR, fallback)
        }
    }
}

pub fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Listing query string. Every value arrives as free text and is normalized
/// server-side; garbage falls back to defaults.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListingParams {
    /// Case-insensitive text search
    pub q: Option<String>,
    /// Category or "all"
    pub category: Option<String>,
    /// Difficulty or "all" (recipes only)
    pub difficulty: Option<String>,
    /// Maximum prep + cook minutes, 0 for unbounded (recipes only)
    pub max_time: Option<String>,
    /// Minimum servings, 0 for unbounded (recipes only)
    pub servings: Option<String>,
    /// Comma-separated tag names or slugs; all must match
    pub tags: Option<String>,
    /// newest, oldest, title-asc, title-desc or popular
    pub sort: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
    /// grid or list
    pub view: Option<String>,
}

impl From<ListingParams> for RawListingParams {
    fn from(params: ListingParams) -> Self {
        RawListingParams {
            q: params.q,
            category: params.category,
            difficulty: params.difficulty,
            max_time: params.max_time,
            servings: params.servings,
            tags: params.tags,
            sort: params.sort,
            page: params.page,
            view: params.view,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMetadata {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl PaginationMetadata {
    pub fn of<T>(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagRefResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<TagRef> for TagRefResponse {
    fn from(tag: TagRef) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
            color: tag.color,
            usage_count: tag.usage_count,
            created_at: tag.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub cuisine: Option<String>,
    pub difficulty: String,
    pub servings: i32,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub total_time_minutes: i32,
    pub published: bool,
    pub featured: bool,
    pub author_id: Uuid,
    pub tags: Vec<TagRefResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Recipe> for RecipeResponse {
    fn from(recipe: Recipe) -> Self {
        Self {
            total_time_minutes: recipe.total_time_minutes(),
            id: recipe.id,
            slug: recipe.slug,
            title: recipe.title,
            description: recipe.description,
            category: recipe.category,
            cuisine: recipe.cuisine,
            difficulty: recipe.difficulty,
            servings: recipe.servings,
            prep_time_minutes: recipe.prep_time_minutes,
            cook_time_minutes: recipe.cook_time_minutes,
            published: recipe.published,
            featured: recipe.featured,
            author_id: recipe.author_id,
            tags: recipe.tags.into_iter().map(TagRefResponse::from).collect(),
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    /// "draft" or "published"
    pub status: String,
    pub category: String,
    pub featured: bool,
    pub view_count: i64,
    pub author_id: Uuid,
    pub tags: Vec<TagRefResponse>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BlogPost> for PostResponse {
    fn from(post: BlogPost) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            content: post.content,
            status: post.status.to_string(),
            category: post.category,
            featured: post.featured,
            view_count: post.view_count,
            author_id: post.author_id,
            tags: post.tags.into_iter().map(TagRefResponse::from).collect(),
            published_at: post.published_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let proxied = github::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit,
    ));

    Router::new()
        .nest("/api/recipes", recipes::router())
        .nest("/api/posts", posts::router())
        .nest("/api/tags", tags::router())
        .nest("/api/github", proxied)
        .nest("/api/admin", admin::router())
        .with_state(state)
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Base spec with shared components and security
    #[derive(OpenApi)]
    #[openapi(components(schemas(
        ErrorResponse,
        PaginationMetadata,
        TagRefResponse,
        TagResponse,
        RecipeResponse,
        PostResponse,
    )))]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        recipes::ApiDoc::openapi(),
        posts::ApiDoc::openapi(),
        tags::ApiDoc::openapi(),
        github::ApiDoc::openapi(),
        admin::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}
