//! Identity store access
//!
//! The traits are the seams the bootstrap depends on; `MemoryIdentityStore`
//! and the PostgreSQL repositories are the two back-ends shipped with it.

pub mod memory;
pub mod role;
pub mod user;

use async_trait::async_trait;

use crate::{
    models::{Role, User},
    Result,
};

pub use memory::MemoryIdentityStore;
pub use role::PgRoleRepository;
pub use user::PgUserRepository;

/// Role lookup and persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find a role by its exact (case-sensitive) identifier
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>>;

    /// Whether a role with this identifier exists
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Persist a new role
    ///
    /// Fails with [`crate::Error::AlreadyExists`] when the identifier is taken.
    async fn insert(&self, role: &Role) -> Result<Role>;
}

/// User lookup and persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by exact name
    async fn find_by_name(&self, name: &str) -> Result<Option<User>>;

    /// Whether a user with this name exists
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.find_by_name(name).await?.is_some())
    }

    /// Persist a new user
    ///
    /// Fails with [`crate::Error::AlreadyExists`] when the name is taken.
    async fn insert(&self, user: &User) -> Result<User>;
}
