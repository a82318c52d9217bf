use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use galley_core::{CurrentUser, IdentityProvider, Role};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::db::DbPool;
use crate::models::User;
use crate::schema::{sessions, users};

/// Tokens are stored as hex-encoded SHA-256 digests, never in the clear.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves bearer tokens against the `sessions` table populated by the
/// identity provider.
pub struct SessionIdentityProvider {
    pool: Arc<DbPool>,
}

impl SessionIdentityProvider {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

fn lookup(pool: &DbPool, token_hash: &str) -> anyhow::Result<Option<User>> {
    let mut conn = pool.get()?;
    let user = sessions::table
        .inner_join(users::table)
        .filter(sessions::token_hash.eq(token_hash))
        .filter(sessions::expires_at.gt(Utc::now()))
        .select(User::as_select())
        .first(&mut conn)
        .optional()?;
    Ok(user)
}

#[async_trait]
impl IdentityProvider for SessionIdentityProvider {
    async fn current_user(&self, token: &str) -> Option<CurrentUser> {
        let pool = self.pool.clone();
        let token_hash = hash_token(token);
        let user = match tokio::task::spawn_blocking(move || lookup(&pool, &token_hash)).await {
            Ok(Ok(user)) => user?,
            Ok(Err(e)) => {
                // Callers only see "unauthorized"; keep the outage visible here
                tracing::warn!("Session lookup failed: {}", e);
                return None;
            }
            Err(e) => {
                tracing::warn!("Session lookup task failed: {}", e);
                return None;
            }
        };

        let role = match user.role.parse::<Role>() {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(user_id = %user.id, "Ignoring session with {}", e);
                return None;
            }
        };
        Some(CurrentUser {
            id: user.id,
            name: user.display_name,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::r2d2::{ConnectionManager, Pool};
    use std::time::Duration;

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("secret");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
        assert_ne!(hash_token("secret"), hash_token("Secret"));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_an_error_not_a_miss() {
        let manager = ConnectionManager::<PgConnection>::new("postgres://galley@127.0.0.1:1/galley");
        let pool = Pool::builder()
            .connection_timeout(Duration::from_millis(100))
            .build_unchecked(manager);

        assert!(lookup(&pool, &hash_token("secret")).is_err());

        let provider = SessionIdentityProvider::new(Arc::new(pool));
        assert!(provider.current_user("secret").await.is_none());
    }
}
