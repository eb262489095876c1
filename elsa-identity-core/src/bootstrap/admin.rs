//! Administrator identity bootstrap
//!
//! Seeds the admin role and, when credentials are configured, the admin user.
//! Each run is a one-shot seed: existing entries are never updated, so a role
//! whose permissions drifted from configuration, or a user with a stale role
//! assignment, is left as-is.

use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::startup::StartupTask;
use crate::{
    config::{AdminConfig, ResolvedAdmin},
    models::{RoleSpec, UserSpec},
    repository::{RoleRepository, UserRepository},
    service::{RoleProvisioner, RoleService, UserProvisioner, UserService},
    Error,
};

/// External calls made by a bootstrap run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    RoleLookup,
    RoleCreate,
    UserLookup,
    UserCreate,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RoleLookup => "role lookup",
            Self::RoleCreate => "role creation",
            Self::UserLookup => "user lookup",
            Self::UserCreate => "user creation",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// A collaborator call failed; the rest of the run was skipped
    #[error("Admin bootstrap failed during {step}: {source}")]
    Failed {
        step: BootstrapStep,
        #[source]
        source: Error,
    },

    /// The run was cancelled before `step` completed. Anything created by
    /// earlier steps stays in the store.
    #[error("Admin bootstrap cancelled during {step}")]
    Cancelled { step: BootstrapStep },
}

impl BootstrapError {
    #[must_use]
    pub const fn step(&self) -> BootstrapStep {
        match self {
            Self::Failed { step, .. } | Self::Cancelled { step } => *step,
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Why a creation did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Found by the lookup
    AlreadyExists,
    /// Missed by the lookup, then rejected by the store as a duplicate:
    /// another instance won the race
    CreatedConcurrently,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleStep {
    Created { permission_count: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserStep {
    Created { name: String, role: String },
    Skipped(SkipReason),
    /// Username or password not configured
    NoCredentials,
}

/// Terminal outcome of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The admin user was created in this run
    CompletedWithUser,
    /// The admin user already existed; only the role step could have changed anything
    CompletedRoleOnly,
    /// No credentials configured; only the role step ran
    SkippedNoCredentials,
}

impl fmt::Display for BootstrapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CompletedWithUser => "completed with user",
            Self::CompletedRoleOnly => "completed role only",
            Self::SkippedNoCredentials => "skipped (no credentials)",
        })
    }
}

/// What a run did at each decision point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub role_name: String,
    pub role: RoleStep,
    pub user: UserStep,
}

impl BootstrapReport {
    #[must_use]
    pub const fn outcome(&self) -> BootstrapOutcome {
        match self.user {
            UserStep::Created { .. } => BootstrapOutcome::CompletedWithUser,
            UserStep::Skipped(_) => BootstrapOutcome::CompletedRoleOnly,
            UserStep::NoCredentials => BootstrapOutcome::SkippedNoCredentials,
        }
    }

    /// Whether this run created anything
    #[must_use]
    pub const fn changed_store(&self) -> bool {
        matches!(self.role, RoleStep::Created { .. }) || matches!(self.user, UserStep::Created { .. })
    }
}

/// The identity store capabilities a bootstrap run needs
#[derive(Clone)]
pub struct IdentityCollaborators {
    pub roles: Arc<dyn RoleRepository>,
    pub role_provisioner: Arc<dyn RoleProvisioner>,
    pub users: Arc<dyn UserRepository>,
    pub user_provisioner: Arc<dyn UserProvisioner>,
}

impl IdentityCollaborators {
    /// Wire the default provisioning services over a pair of repositories
    #[must_use]
    pub fn with_services(roles: Arc<dyn RoleRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            role_provisioner: Arc::new(RoleService::new(roles.clone())),
            user_provisioner: Arc::new(UserService::new(users.clone())),
            roles,
            users,
        }
    }
}

/// Ensures the admin role and user exist
pub struct AdminBootstrap {
    settings: ResolvedAdmin,
    collaborators: IdentityCollaborators,
}

impl AdminBootstrap {
    #[must_use]
    pub fn new(config: &AdminConfig, collaborators: IdentityCollaborators) -> Self {
        Self {
            settings: config.resolve(),
            collaborators,
        }
    }

    /// Settings with defaults applied
    #[must_use]
    pub const fn settings(&self) -> &ResolvedAdmin {
        &self.settings
    }

    /// Seed the admin role, then the admin user.
    ///
    /// Calls are strictly sequential. The first failing call aborts the run
    /// with no retry; a duplicate rejected by the store is reported as a skip.
    #[instrument(name = "admin_bootstrap", skip_all, fields(role = %self.settings.role_name))]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<BootstrapReport, BootstrapError> {
        let result = self.seed(cancel).await;

        if let Err(e) = &result {
            match e {
                BootstrapError::Cancelled { step } => {
                    warn!(step = %step, "Admin bootstrap cancelled");
                }
                BootstrapError::Failed { step, source } => {
                    error!(step = %step, error = %source, "Admin bootstrap failed");
                }
            }
        }

        result
    }

    async fn seed(&self, cancel: &CancellationToken) -> Result<BootstrapReport, BootstrapError> {
        let role = self.ensure_role(cancel).await?;
        let user = self.ensure_user(cancel).await?;
        Ok(BootstrapReport {
            role_name: self.settings.role_name.clone(),
            role,
            user,
        })
    }

    async fn ensure_role(&self, cancel: &CancellationToken) -> Result<RoleStep, BootstrapError> {
        let role_name = &self.settings.role_name;

        let existing = cancellable(
            cancel,
            BootstrapStep::RoleLookup,
            self.collaborators.roles.find_by_id(role_name),
        )
        .await?
        .map_err(|source| BootstrapError::Failed {
            step: BootstrapStep::RoleLookup,
            source,
        })?;

        if existing.is_some() {
            info!("Admin role '{}' already exists. Skipping creation.", role_name);
            return Ok(RoleStep::Skipped(SkipReason::AlreadyExists));
        }

        let spec = RoleSpec::named(role_name.clone(), self.settings.permissions.clone());
        let created = cancellable(
            cancel,
            BootstrapStep::RoleCreate,
            self.collaborators.role_provisioner.create_role(&spec),
        )
        .await?;

        match created {
            Ok(role) => {
                info!(
                    permission_count = role.permission_count(),
                    "Admin role '{}' created successfully with {} permissions.",
                    role.name,
                    role.permission_count()
                );
                Ok(RoleStep::Created {
                    permission_count: role.permission_count(),
                })
            }
            Err(e) if e.is_already_exists() => {
                info!(
                    "Admin role '{}' was created concurrently by another instance. Skipping creation.",
                    role_name
                );
                Ok(RoleStep::Skipped(SkipReason::CreatedConcurrently))
            }
            Err(source) => Err(BootstrapError::Failed {
                step: BootstrapStep::RoleCreate,
                source,
            }),
        }
    }

    async fn ensure_user(&self, cancel: &CancellationToken) -> Result<UserStep, BootstrapError> {
        let Some(credentials) = &self.settings.credentials else {
            warn!(
                "ELSA_ADMIN_USER and/or ELSA_ADMIN_PASSWORD not configured. Skipping admin user creation; \
                 provision administrators through the identity administration API instead."
            );
            return Ok(UserStep::NoCredentials);
        };
        let role_name = &self.settings.role_name;

        let existing = cancellable(
            cancel,
            BootstrapStep::UserLookup,
            self.collaborators.users.find_by_name(&credentials.username),
        )
        .await?
        .map_err(|source| BootstrapError::Failed {
            step: BootstrapStep::UserLookup,
            source,
        })?;

        if existing.is_some() {
            info!("Admin user '{}' already exists. Skipping creation.", credentials.username);
            return Ok(UserStep::Skipped(SkipReason::AlreadyExists));
        }

        let spec = UserSpec {
            name: credentials.username.clone(),
            password: credentials.password.clone(),
            roles: vec![role_name.clone()],
        };
        let created = cancellable(
            cancel,
            BootstrapStep::UserCreate,
            self.collaborators.user_provisioner.create_user(&spec),
        )
        .await?;

        match created {
            Ok(user) => {
                info!(
                    "Admin user '{}' created successfully with role '{}'.",
                    user.name, role_name
                );
                Ok(UserStep::Created {
                    name: user.name,
                    role: role_name.clone(),
                })
            }
            Err(e) if e.is_already_exists() => {
                info!(
                    "Admin user '{}' was created concurrently by another instance. Skipping creation.",
                    credentials.username
                );
                Ok(UserStep::Skipped(SkipReason::CreatedConcurrently))
            }
            Err(source) => Err(BootstrapError::Failed {
                step: BootstrapStep::UserCreate,
                source,
            }),
        }
    }
}

#[async_trait]
impl StartupTask for AdminBootstrap {
    fn name(&self) -> &'static str {
        "admin-bootstrap"
    }

    async fn execute(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let report = self.run(&cancel).await?;
        info!(
            outcome = %report.outcome(),
            changed = report.changed_store(),
            "Admin bootstrap finished"
        );
        Ok(())
    }
}

/// Await `call` unless `cancel` fires first.
///
/// The outer `Result` carries cancellation, the inner one the call's own result.
async fn cancellable<T, F>(
    cancel: &CancellationToken,
    step: BootstrapStep,
    call: F,
) -> Result<crate::Result<T>, BootstrapError>
where
    F: Future<Output = crate::Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(BootstrapError::Cancelled { step }),
        result = call => Ok(result),
    }
}
