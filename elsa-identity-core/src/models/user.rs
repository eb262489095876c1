use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;
use crate::config::Secret;

/// User entity
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Identifiers of the roles assigned to this user
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(name: String, password_hash: String, roles: Vec<String>) -> Self {
        Self {
            id: UserId::new(),
            name,
            password_hash,
            roles,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("password_hash", &"[REDACTED]")
            .field("roles", &self.roles)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Request to create a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub name: String,
    pub password: Secret,
    pub roles: Vec<String>,
}
