use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WILDCARD_PERMISSION;

/// A named bundle of permission strings
///
/// The identifier is case-sensitive and unique within the store; uniqueness
/// is enforced by the store, not by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Whether the role carries the `*` wildcard
    #[must_use]
    pub fn grants_all(&self) -> bool {
        self.permissions.iter().any(|p| p == WILDCARD_PERMISSION)
    }

    #[must_use]
    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }
}

/// Request to create a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub id: String,
    pub name: String,
    /// Order is irrelevant; duplicates are collapsed on creation
    pub permissions: Vec<String>,
}

impl RoleSpec {
    /// A role whose display name equals its identifier
    #[must_use]
    pub fn named(id: impl Into<String>, permissions: Vec<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            permissions,
        }
    }

    /// Permissions sorted and deduplicated
    #[must_use]
    pub fn normalized_permissions(&self) -> Vec<String> {
        let mut permissions: Vec<String> = self
            .permissions
            .iter()
            .map(|p| p.trim().to_string())
            .collect();
        permissions.sort();
        permissions.dedup();
        permissions
    }
}
