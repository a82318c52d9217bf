use anyhow::{anyhow, Result};
use galley_core::github::RepoRef;
use galley_core::RateLimitConfig;
use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Without one the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub github_repo: RepoRef,
    pub github_token: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub sweep_every: Duration,
    /// Only enable behind a reverse proxy that overwrites `X-Forwarded-For`.
    pub trust_forwarded_for: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let owner: String = try_load("GITHUB_OWNER", "rust-lang")?;
        let repo: String = try_load("GITHUB_REPO", "rust")?;
        let branch: String = try_load("GITHUB_BRANCH", "master")?;
        let max_requests: u32 = try_load("RATE_LIMIT_MAX", "60")?;
        let window_ms: u64 = try_load("RATE_LIMIT_WINDOW_MS", "60000")?;
        let sweep_ms: u64 = try_load("RATE_LIMIT_SWEEP_MS", "60000")?;

        if max_requests == 0 || window_ms == 0 || sweep_ms == 0 {
            return Err(anyhow!(
                "RATE_LIMIT_MAX, RATE_LIMIT_WINDOW_MS and RATE_LIMIT_SWEEP_MS must be positive"
            ));
        }

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:3000")?,
            github_repo: RepoRef::parse(&owner, &repo, &branch)
                .map_err(|e| anyhow!("Invalid GITHUB_* setting: {e}"))?,
            github_token: optional("GITHUB_TOKEN"),
            rate_limit: RateLimitConfig::new(max_requests, Duration::from_millis(window_ms)),
            sweep_every: Duration::from_millis(sweep_ms),
            trust_forwarded_for: try_load("TRUST_FORWARDED_FOR", "false")?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn optional(key: &str) -> Option<String> {
    let value = var(key);
    if value.is_none() {
        warn!("{key} not set");
    }
    value
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
}
