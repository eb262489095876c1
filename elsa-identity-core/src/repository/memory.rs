use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use super::{RoleRepository, UserRepository};
use crate::{
    models::{Role, User},
    Error, Result,
};

/// Process-local identity store
///
/// Inserts are atomic per key, so concurrent creators of the same role or
/// user see exactly one success and `AlreadyExists` for the rest. State is
/// lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    roles: DashMap<String, Role>,
    users: DashMap<String, User>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl RoleRepository for MemoryIdentityStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        Ok(self.roles.get(id).map(|r| r.value().clone()))
    }

    async fn insert(&self, role: &Role) -> Result<Role> {
        match self.roles.entry(role.id.clone()) {
            Entry::Occupied(_) => Err(Error::AlreadyExists(format!(
                "Role '{}' already exists",
                role.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(role.clone());
                Ok(role.clone())
            }
        }
    }
}

#[async_trait]
impl UserRepository for MemoryIdentityStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self.users.get(name).map(|u| u.value().clone()))
    }

    async fn insert(&self, user: &User) -> Result<User> {
        match self.users.entry(user.name.clone()) {
            Entry::Occupied(_) => Err(Error::AlreadyExists(format!(
                "User '{}' already exists",
                user.name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user.clone())
            }
        }
    }
}
