//! Role and user provisioning on top of the identity repositories

pub mod password;
pub mod role;
pub mod user;

use async_trait::async_trait;

use crate::{
    models::{Role, RoleSpec, User, UserSpec},
    Result,
};

pub use password::{hash_password, verify_password};
pub use role::RoleService;
pub use user::UserService;

/// Creates roles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleProvisioner: Send + Sync {
    /// Create a role; fails with [`crate::Error::AlreadyExists`] on a duplicate identifier
    async fn create_role(&self, spec: &RoleSpec) -> Result<Role>;
}

/// Creates users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserProvisioner: Send + Sync {
    /// Create a user; fails with [`crate::Error::AlreadyExists`] on a duplicate name
    async fn create_user(&self, spec: &UserSpec) -> Result<User>;
}
