mod api;
mod auth;
mod cache;
mod config;
mod db;
mod models;
mod raw_sql;
mod rate_limit;
mod schema;
mod state;
mod store;
mod telemetry;

use anyhow::{Context, Result};
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::Router;
use galley_core::github::{CachingCommitSource, CommitSource, GithubClient};
use galley_core::{
    ContentStore, FixedWindowLimiter, IdentityProvider, MemoryContentStore, RateLimitConfig,
    StaticIdentityProvider,
};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::SessionIdentityProvider;
use crate::config::Config;
use crate::state::AppState;
use crate::store::PgContentStore;

/// Outbound GitHub calls share one budget across all clients.
const GITHUB_CALLS_PER_HOUR: u32 = 50;

fn storage(config: &Config) -> Result<(Arc<dyn ContentStore>, Arc<dyn IdentityProvider>)> {
    match &config.database_url {
        Some(url) => {
            let pool = Arc::new(db::create_pool(url)?);
            let store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(pool.clone()));
            let identity: Arc<dyn IdentityProvider> = Arc::new(SessionIdentityProvider::new(pool));
            Ok((store, identity))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, using in-memory storage; admin routes will reject every token"
            );
            let store: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());
            let identity: Arc<dyn IdentityProvider> = Arc::new(StaticIdentityProvider::new());
            Ok((store, identity))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        let spec = api::openapi()
            .to_pretty_json()
            .context("Failed to render OpenAPI spec")?;
        println!("{}", spec);
        return Ok(());
    }

    telemetry::init_telemetry()?;

    let config = Config::load()?;
    let (store, identity) = storage(&config)?;

    let github_limiter = Arc::new(FixedWindowLimiter::in_memory(RateLimitConfig::new(
        GITHUB_CALLS_PER_HOUR,
        Duration::from_secs(60 * 60),
    )));
    let client = GithubClient::builder()
        .token(config.github_token.clone())
        .limiter(github_limiter.clone())
        .build()
        .context("Failed to build GitHub client")?;
    let commits: Arc<dyn CommitSource> = Arc::new(CachingCommitSource::new(Arc::new(client)));

    let api_limiter = Arc::new(FixedWindowLimiter::in_memory(config.rate_limit.clone()));
    api_limiter.spawn_sweeper(config.sweep_every);
    github_limiter.spawn_sweeper(config.sweep_every);

    let state = AppState::new(
        store,
        identity,
        commits,
        config.github_repo.clone(),
        api_limiter,
    )
    .with_trusted_forwarded_for(config.trust_forwarded_for);

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let app = Router::new()
        .merge(api::router(state))
        .merge(swagger_ui)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    let local_addr = listener.local_addr()?;

    tracing::info!("Server listening on {}", local_addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", local_addr);
    tracing::info!(
        "OpenAPI spec available at http://{}/api-docs/openapi.json",
        local_addr
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
