use crate::api::admin::parse_id;
use crate::api::{
    internal_error, mutation_error, tag_error_response, ErrorResponse, MutationResponse,
    TagResponse,
};
use crate::auth::AdminUser;
use crate::cache::ListingKey;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use galley_core::TagError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminTagsResponse {
    pub tags: Vec<TagResponse>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateTagForm {
    pub name: String,
    /// `#rrggbb`, leading `#` optional
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct BulkCreateTagsForm {
    /// Comma-separated tag names
    pub names: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateTagForm {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct MergeTagsForm {
    /// Tag that disappears
    pub source_id: String,
    /// Tag that receives every reference
    pub target_id: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/tags",
    tag = "admin",
    responses(
        (status = 200, description = "Every tag with its usage count", body = AdminTagsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_tags(AdminUser(_user): AdminUser, State(state): State<AppState>) -> impl IntoResponse {
    if let Some(body) = state.listings.get(ListingKey::AdminTags) {
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

    let response = AdminTagsResponse {
        tags: tags.into_iter().map(TagResponse::from).collect(),
    };
    match serde_json::to_value(response) {
        Ok(body) => {
            state.listings.put(ListingKey::AdminTags, generation, body.clone());
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to serialize tags: {}", e);
            internal_error("Failed to fetch tags")
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/tags",
    tag = "admin",
    request_body(content = CreateTagForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Tag created", body = MutationResponse<TagResponse>),
        (status = 422, description = "Invalid name or color, or duplicate name"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_tag(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
    Form(form): Form<CreateTagForm>,
) -> impl IntoResponse {
    match state.tags.create(&form.name, form.color.as_deref()).await {
        Ok(tag) => {
            state.listings.invalidate_tags();
            tracing::info!(user_id = %user.id, tag_id = %tag.id, "admin created tag");
            MutationResponse::ok(StatusCode::CREATED, TagResponse::from(tag))
        }
        Err(e) => tag_error_response(e, "Failed to create tag"),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/tags/bulk",
    tag = "admin",
    request_body(content = BulkCreateTagsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "One tag per distinct slug, existing tags reused", body = MutationResponse<Vec<TagResponse>>),
        (status = 422, description = "A name is invalid"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn bulk_create_tags(
    AdminUser(_user): AdminUser,
    State(state): State<AppState>,
    Form(form): Form<BulkCreateTagsForm>,
) -> impl IntoResponse {
    let names: Vec<&str> = form
        .names
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return mutation_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "names: At least one tag name is required",
        );
    }

    match state.tags.bulk_create(&names).await {
        Ok(tags) => {
            state.listings.invalidate_tags();
            let tags: Vec<TagResponse> = tags.into_iter().map(TagResponse::from).collect();
            MutationResponse::ok(StatusCode::OK, tags)
        }
        Err(e) => {
            // A storage failure midway may have written some tags
            if matches!(e, TagError::Store(_)) {
                state.listings.invalidate_tags();
            }
            tag_error_response(e, "Failed to create tags")
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/tags/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "Tag ID (UUID)")
    ),
    request_body(content = UpdateTagForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Tag updated", body = MutationResponse<TagResponse>),
        (status = 404, description = "Tag not found"),
        (status = 422, description = "Invalid name or color, or duplicate name"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_tag(
    AdminUser(_user): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<UpdateTagForm>,
) -> impl IntoResponse {
    let Some(id) = parse_id(&id) else {
        return mutation_error(StatusCode::NOT_FOUND, "Tag not found");
    };

    match state
        .tags
        .update(id, form.name.as_deref(), form.color.as_deref())
        .await
    {
        Ok(tag) => {
            state.listings.invalidate_tags();
            MutationResponse::ok(StatusCode::OK, TagResponse::from(tag))
        }
        Err(e) => tag_error_response(e, "Failed to update tag"),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/tags/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "Tag ID (UUID)")
    ),
    responses(
        (status = 200, description = "Tag and its references removed"),
        (status = 404, description = "Tag not found"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_tag(
    AdminUser(_user): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(id) = parse_id(&id) else {
        return mutation_error(StatusCode::NOT_FOUND, "Tag not found");
    };

    match state.tags.delete(id).await {
        Ok(()) => {
            state.listings.invalidate_tags();
            (
                StatusCode::OK,
                Json(MutationResponse::<()> {
                    success: true,
                    data: None,
                    error: None,
                }),
            )
                .into_response()
        }
        Err(e) => tag_error_response(e, "Failed to delete tag"),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/tags/merge",
    tag = "admin",
    request_body(content = MergeTagsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Source merged into target; returns the target", body = MutationResponse<TagResponse>),
        (status = 404, description = "Either tag not found"),
        (status = 422, description = "Invalid ids or merging a tag into itself"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn merge_tags(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
    Form(form): Form<MergeTagsForm>,
) -> impl IntoResponse {
    let Some(source) = parse_id(&form.source_id) else {
        return mutation_error(StatusCode::UNPROCESSABLE_ENTITY, "source_id: Invalid tag id");
    };
    let Some(target) = parse_id(&form.target_id) else {
        return mutation_error(StatusCode::UNPROCESSABLE_ENTITY, "target_id: Invalid tag id");
    };

    match state.tags.merge(source, target).await {
        Ok(tag) => {
            state.listings.invalidate_tags();
            tracing::info!(user_id = %user.id, source_id = %source, target_id = %target, "admin merged tags");
            MutationResponse::ok(StatusCode::OK, TagResponse::from(tag))
        }
        Err(e) => tag_error_response(e, "Failed to merge tags"),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{
        get_json, get_json_as, send_form, seeded_state, ADMIN_TOKEN, READER_TOKEN,
    };
    use crate::cache::ListingKey;
    use axum::http::{Method, StatusCode};
    use galley_core::{ContentStore, Visibility};

    #[tokio::test]
    async fn test_requires_admin_identity() {
        let state = seeded_state().await;

        let (status, body) = get_json(state.clone(), "/api/admin/tags").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, body) = get_json_as(state.clone(), "/api/admin/tags", READER_TOKEN).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = get_json_as(state, "/api/admin/tags", ADMIN_TOKEN).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_tag_and_reject_duplicate() {
        let state = seeded_state().await;

        let (status, body) = send_form(
            state.clone(),
            Method::POST,
            "/api/admin/tags",
            "name=Web+Development&color=ABCDEF",
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["slug"], "web-development");
        assert_eq!(body["data"]["color"], "#abcdef");

        let (status, body) = send_form(
            state,
            Method::POST,
            "/api/admin/tags",
            "name=web-development",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("name:"));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_invalid_color_is_rejected() {
        let state = seeded_state().await;
        let (status, body) = send_form(
            state,
            Method::POST,
            "/api/admin/tags",
            "name=Grill&color=orange",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().starts_with("color:"));
    }

    #[tokio::test]
    async fn test_bulk_create_collapses_duplicates() {
        let state = seeded_state().await;
        let (status, body) = send_form(
            state,
            Method::POST,
            "/api/admin/tags/bulk",
            "names=Dessert%2C+New+One%2C+new-one",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let slugs: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["dessert", "new-one"]);
    }

    #[tokio::test]
    async fn test_bulk_create_with_bad_name_writes_nothing() {
        let state = seeded_state().await;
        let (_, before) = get_json_as(state.clone(), "/api/admin/tags", ADMIN_TOKEN).await;

        let (status, body) = send_form(
            state.clone(),
            Method::POST,
            "/api/admin/tags/bulk",
            "names=Brand+New%2C+%3F%3F%3F",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);

        assert!(state.store.tag_by_slug("brand-new").await.unwrap().is_none());
        let (_, after) = get_json_as(state, "/api/admin/tags", ADMIN_TOKEN).await;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_writes_invalidate_cached_listings() {
        let state = seeded_state().await;
        let (_, before) = get_json_as(state.clone(), "/api/admin/tags", ADMIN_TOKEN).await;
        assert!(state.listings.get(ListingKey::AdminTags).is_some());

        send_form(state.clone(), Method::POST, "/api/admin/tags", "name=Fresh").await;
        assert!(state.listings.get(ListingKey::AdminTags).is_none());

        let (_, after) = get_json_as(state, "/api/admin/tags", ADMIN_TOKEN).await;
        assert_eq!(
            after["tags"].as_array().unwrap().len(),
            before["tags"].as_array().unwrap().len() + 1
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_tag() {
        let state = seeded_state().await;
        let quick = state.store.tag_by_slug("quick").await.unwrap().unwrap();

        let (status, body) = send_form(
            state.clone(),
            Method::POST,
            &format!("/api/admin/tags/{}", quick.id),
            "name=Speedy",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "speedy");
        assert_eq!(body["data"]["color"], quick.color);

        let (status, body) = send_form(
            state.clone(),
            Method::DELETE,
            &format!("/api/admin/tags/{}", quick.id),
            "",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send_form(
            state,
            Method::DELETE,
            &format!("/api/admin/tags/{}", quick.id),
            "",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_merge_moves_references() {
        let state = seeded_state().await;
        let quick = state.store.tag_by_slug("quick").await.unwrap().unwrap();
        let dessert = state.store.tag_by_slug("dessert").await.unwrap().unwrap();

        let (status, body) = send_form(
            state.clone(),
            Method::POST,
            "/api/admin/tags/merge",
            &format!("source_id={}&target_id={}", quick.id, dessert.id),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], dessert.id.to_string());

        assert!(state.store.tag_by_id(quick.id).await.unwrap().is_none());
        let tart = state
            .store
            .recipe_by_slug("lemon-tart", Visibility::Any)
            .await
            .unwrap()
            .unwrap();
        let slugs: Vec<&str> = tart.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["dessert"]);
    }

    #[tokio::test]
    async fn test_merge_into_itself_is_rejected() {
        let state = seeded_state().await;
        let quick = state.store.tag_by_slug("quick").await.unwrap().unwrap();

        let (status, body) = send_form(
            state.clone(),
            Method::POST,
            "/api/admin/tags/merge",
            &format!("source_id={}&target_id={}", quick.id, quick.id),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);

        let (status, _) = send_form(
            state,
            Method::POST,
            "/api/admin/tags/merge",
            "source_id=nope&target_id=nope",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
