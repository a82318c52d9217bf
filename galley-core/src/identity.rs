//! Caller identity as reported by the external identity provider.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Editor,
    Reader,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "reader" => Ok(Role::Reader),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    /// Admins and editors may use the back-office.
    pub fn can_manage_content(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Editor)
    }
}

/// Resolves a bearer token to the user it was issued to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` for unknown, expired or malformed tokens.
    async fn current_user(&self, token: &str) -> Option<CurrentUser>;
}

/// Fixed token table, for tests and database-less local runs.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    users: HashMap<String, CurrentUser>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, user: CurrentUser) -> Self {
        self.users.insert(token.to_string(), user);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_user(&self, token: &str) -> Option<CurrentUser> {
        self.users.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_static_provider_lookup() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            role: Role::Editor,
        };
        let provider = StaticIdentityProvider::new().with_user("secret", user.clone());

        assert_eq!(provider.current_user("secret").await, Some(user));
        assert_eq!(provider.current_user("guess").await, None);
    }

    #[test]
    fn test_roles() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());

        let reader = CurrentUser {
            id: Uuid::new_v4(),
            name: "Bo".to_string(),
            role: Role::Reader,
        };
        assert!(!reader.can_manage_content());
    }
}
