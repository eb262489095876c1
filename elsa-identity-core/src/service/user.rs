use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{password::hash_password, UserProvisioner};
use crate::{
    models::{User, UserSpec},
    repository::UserRepository,
    validation::{validate_password, NameValidator},
    Error, Result,
};

/// User provisioning service
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    /// Look up a user by name
    pub async fn get(&self, name: &str) -> Result<Option<User>> {
        self.repository.find_by_name(name).await
    }
}

#[async_trait]
impl UserProvisioner for UserService {
    async fn create_user(&self, spec: &UserSpec) -> Result<User> {
        NameValidator::new("username").validate(&spec.name)?;
        validate_password(spec.password.expose())?;
        if spec.roles.is_empty() {
            return Err(Error::InvalidInput(
                "A user must be assigned at least one role".to_string(),
            ));
        }
        for role in &spec.roles {
            NameValidator::new("role id").validate(role)?;
        }

        let password_hash = hash_password(spec.password.expose()).await?;
        let user = User::new(spec.name.clone(), password_hash, spec.roles.clone());

        let created = self.repository.insert(&user).await?;
        debug!(user = %created.name, id = %created.id, "User persisted");
        Ok(created)
    }
}
