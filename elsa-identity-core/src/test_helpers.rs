//! Test helpers and fixtures for elsa-identity-core tests

use crate::models::{Role, User, UserId};
use chrono::Utc;

/// Test fixture builder for Role
pub struct RoleFixture {
    id: String,
    name: Option<String>,
    permissions: Vec<String>,
}

impl RoleFixture {
    pub fn new() -> Self {
        Self {
            id: "Admin".to_string(),
            name: None,
            permissions: vec!["*".to_string()],
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(ToString::to_string).collect();
        self
    }

    pub fn build(self) -> Role {
        Role {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            permissions: self.permissions,
            created_at: Utc::now(),
        }
    }
}

impl Default for RoleFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Test fixture builder for User
pub struct UserFixture {
    id: UserId,
    name: String,
    password_hash: String,
    roles: Vec<String>,
}

impl UserFixture {
    pub fn new() -> Self {
        Self {
            id: UserId::new(),
            name: "test_user".to_string(),
            password_hash: "hash".to_string(),
            roles: vec!["Admin".to_string()],
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(ToString::to_string).collect();
        self
    }

    pub fn build(self) -> User {
        User {
            id: self.id,
            name: self.name,
            password_hash: self.password_hash,
            roles: self.roles,
            created_at: Utc::now(),
        }
    }
}

impl Default for UserFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_fixture_defaults_name_to_id() {
        let role = RoleFixture::new().with_id("Ops").build();
        assert_eq!(role.name, "Ops");
        let role = RoleFixture::new().with_id("Ops").with_name("Operators").build();
        assert_eq!(role.name, "Operators");
    }

    #[test]
    fn test_user_fixture() {
        let user = UserFixture::new().with_name("bob").build();
        assert_eq!(user.id.as_str().len(), 12);
        assert_eq!(user.name, "bob");
        assert!(user.has_role("Admin"));
    }
}
