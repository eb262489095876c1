use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::RoleProvisioner;
use crate::{
    models::{Role, RoleSpec},
    repository::RoleRepository,
    validation::{validate_permissions, NameValidator},
    Result,
};

/// Role provisioning service
#[derive(Clone)]
pub struct RoleService {
    repository: Arc<dyn RoleRepository>,
}

impl RoleService {
    #[must_use]
    pub fn new(repository: Arc<dyn RoleRepository>) -> Self {
        Self { repository }
    }

    /// Look up a role by identifier
    pub async fn get(&self, id: &str) -> Result<Option<Role>> {
        self.repository.find_by_id(id).await
    }
}

#[async_trait]
impl RoleProvisioner for RoleService {
    async fn create_role(&self, spec: &RoleSpec) -> Result<Role> {
        NameValidator::new("role id").validate(&spec.id)?;
        NameValidator::new("role name").validate(&spec.name)?;
        validate_permissions(&spec.permissions)?;

        let role = Role {
            id: spec.id.clone(),
            name: spec.name.clone(),
            permissions: spec.normalized_permissions(),
            created_at: Utc::now(),
        };

        let created = self.repository.insert(&role).await?;
        debug!(role = %created.id, permissions = created.permissions.len(), "Role persisted");
        Ok(created)
    }
}
