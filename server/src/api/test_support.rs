//! Router-level test helpers: a seeded in-memory state and request shortcuts.

use crate::api::router;
use crate::state::AppState;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use galley_core::content::{create_post, create_recipe};
use galley_core::github::{CommitSource, FakeCommitSource, RepoRef};
use galley_core::{
    CurrentUser, FixedWindowLimiter, MemoryContentStore, PostDraft, RateLimitConfig, RecipeDraft,
    Role, StaticIdentityProvider,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const READER_TOKEN: &str = "reader-token";

/// Published "Lemon Tart" (dessert, quick) and "Chocolate Mousse" (dessert),
/// unpublished "Secret Stew", published post "Hello World" and draft
/// "Draft Notes".
pub async fn seeded_state() -> AppState {
    seeded_state_with(
        Arc::new(FakeCommitSource::with_commit(
            FakeCommitSource::sample_commit(),
        )),
        None,
    )
    .await
}

pub async fn seeded_state_with(
    commits: Arc<dyn CommitSource>,
    limiter: Option<Arc<FixedWindowLimiter>>,
) -> AppState {
    let admin_id = Uuid::new_v4();
    let identity = StaticIdentityProvider::new()
        .with_user(
            ADMIN_TOKEN,
            CurrentUser {
                id: admin_id,
                name: "Admin".to_string(),
                role: Role::Admin,
            },
        )
        .with_user(
            READER_TOKEN,
            CurrentUser {
                id: Uuid::new_v4(),
                name: "Reader".to_string(),
                role: Role::Reader,
            },
        );
    let limiter = limiter.unwrap_or_else(|| {
        Arc::new(FixedWindowLimiter::in_memory(RateLimitConfig::new(
            10_000,
            Duration::from_secs(60),
        )))
    });

    let state = AppState::new(
        Arc::new(MemoryContentStore::new()),
        Arc::new(identity),
        commits,
        RepoRef::new("octocat", "site", "main"),
        limiter,
    );

    let recipes = [
        ("Lemon Tart", true, vec!["Dessert", "Quick"], 20, 30),
        ("Chocolate Mousse", true, vec!["Dessert"], 30, 0),
        ("Secret Stew", false, vec!["Dessert", "Quick"], 15, 120),
    ];
    for (title, published, tags, prep, cook) in recipes {
        let draft = RecipeDraft {
            title: title.to_string(),
            description: format!("{} from the test kitchen", title),
            category: "dessert".to_string(),
            difficulty: "easy".to_string(),
            servings: 4,
            prep_time_minutes: prep,
            cook_time_minutes: cook,
            published,
            tags: tags.into_iter().map(str::to_string).collect(),
            ..Default::default()
        };
        create_recipe(state.store.as_ref(), &state.tags, draft, admin_id)
            .await
            .unwrap();
    }

    let posts = [
        ("Hello World", "Our first post", true),
        ("Draft Notes", "Not ready yet", false),
    ];
    for (title, excerpt, publish) in posts {
        let draft = PostDraft {
            title: title.to_string(),
            excerpt: excerpt.to_string(),
            content: format!("{}\n\nMore to come.", excerpt),
            publish,
            tags: vec!["Dessert".to_string()],
            ..Default::default()
        };
        create_post(state.store.as_ref(), &state.tags, draft, admin_id)
            .await
            .unwrap();
    }

    state
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(state, request).await
}

pub async fn get_json_as(
    state: AppState,
    uri: &str,
    token: &str,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    send(state, request).await
}

/// Form-encoded request as the admin user.
pub async fn send_form(
    state: AppState,
    method: Method,
    uri: &str,
    body: &str,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(state, request).await
}

/// JSON POST as the admin user.
pub async fn send_json(
    state: AppState,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(state, request).await
}
