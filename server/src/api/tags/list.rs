use crate::api::{internal_error, ErrorResponse};
use crate::cache::ListingKey;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use galley_core::Tag;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicTag {
    pub name: String,
    pub slug: String,
    pub color: String,
    /// Number of published recipes and posts using this tag
    pub usage_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicTagsResponse {
    pub tags: Vec<PublicTag>,
}

fn public_tags(tags: Vec<Tag>) -> PublicTagsResponse {
    PublicTagsResponse {
        tags: tags
            .into_iter()
            .filter(|t| t.usage_count > 0)
            .map(|t| PublicTag {
                name: t.name,
                slug: t.slug,
                color: t.color,
                usage_count: t.usage_count,
            })
            .collect(),
    }
}

/// Tags attached to at least one published recipe or post, by name.
#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    responses(
        (status = 200, description = "Tags in use", body = PublicTagsResponse),
        (status = 500, description = "Listing failed", body = ErrorResponse)
    )
)]
pub async fn list_public_tags(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(body) = state.listings.get(ListingKey::PublicTags) {
        return (StatusCode::OK, Json(body)).into_response();
    }

    let generation = state.listings.generation();
    let tags = match state.tags.list().await {
        Ok(tags) => tags,
        Err(e) => {
            tracing::error!("Failed to fetch tags: {}", e);
            return internal_error("Failed to fetch tags");
        }
    };

    match serde_json::to_value(public_tags(tags)) {
        Ok(body) => {
            state.listings.put(ListingKey::PublicTags, generation, body.clone());
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to serialize tags: {}", e);
            internal_error("Failed to fetch tags")
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{get_json, seeded_state};
    use crate::cache::ListingKey;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_only_tags_in_use_are_listed() {
        let state = seeded_state().await;
        state.tags.create("Unused", None).await.unwrap();

        let (status, body) = get_json(state.clone(), "/api/tags").await;
        assert_eq!(status, StatusCode::OK);
        let slugs: Vec<&str> = body["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["slug"].as_str().unwrap())
            .collect();
        assert!(slugs.contains(&"dessert"));
        assert!(!slugs.contains(&"unused"));
        assert!(state.listings.get(ListingKey::PublicTags).is_some());
    }
}
