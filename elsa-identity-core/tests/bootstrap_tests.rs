//! End-to-end admin bootstrap tests against the in-memory identity store
//!
//! Run with: cargo test -p elsa-identity-core --test bootstrap_tests

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use elsa_identity_core::{
    bootstrap::{
        AdminBootstrap, BootstrapOutcome, BootstrapStep, IdentityCollaborators, RoleStep,
        SkipReason, StartupSequencer, UserStep,
    },
    config::{AdminConfig, AdminRoleConfig, FailurePolicy, Secret},
    models::{Role, RoleSpec, User, UserSpec},
    repository::{MemoryIdentityStore, RoleRepository, UserRepository},
    service::{verify_password, RoleProvisioner, RoleService, UserProvisioner, UserService},
    Result,
};

/// Provisioners that count creation calls before delegating to the real services
struct CountingProvisioners {
    roles: RoleService,
    users: UserService,
    role_creates: AtomicUsize,
    user_creates: AtomicUsize,
}

impl CountingProvisioners {
    fn new(store: &Arc<MemoryIdentityStore>) -> Arc<Self> {
        Arc::new(Self {
            roles: RoleService::new(store.clone()),
            users: UserService::new(store.clone()),
            role_creates: AtomicUsize::new(0),
            user_creates: AtomicUsize::new(0),
        })
    }

    fn role_creates(&self) -> usize {
        self.role_creates.load(Ordering::SeqCst)
    }

    fn user_creates(&self) -> usize {
        self.user_creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleProvisioner for CountingProvisioners {
    async fn create_role(&self, spec: &RoleSpec) -> Result<Role> {
        self.role_creates.fetch_add(1, Ordering::SeqCst);
        self.roles.create_role(spec).await
    }
}

#[async_trait]
impl UserProvisioner for CountingProvisioners {
    async fn create_user(&self, spec: &UserSpec) -> Result<User> {
        self.user_creates.fetch_add(1, Ordering::SeqCst);
        self.users.create_user(spec).await
    }
}

/// A replica whose lookups never see rows written by others
struct StaleView(Arc<MemoryIdentityStore>);

#[async_trait]
impl RoleRepository for StaleView {
    async fn find_by_id(&self, _id: &str) -> Result<Option<Role>> {
        Ok(None)
    }

    async fn insert(&self, role: &Role) -> Result<Role> {
        RoleRepository::insert(self.0.as_ref(), role).await
    }
}

#[async_trait]
impl UserRepository for StaleView {
    async fn find_by_name(&self, _name: &str) -> Result<Option<User>> {
        Ok(None)
    }

    async fn insert(&self, user: &User) -> Result<User> {
        UserRepository::insert(self.0.as_ref(), user).await
    }
}

fn admin_config(user: Option<&str>, password: Option<&str>) -> AdminConfig {
    AdminConfig {
        user: user.map(ToString::to_string),
        password: password.map(Secret::new),
        role: AdminRoleConfig::default(),
    }
}

fn counted(
    store: &Arc<MemoryIdentityStore>,
) -> (IdentityCollaborators, Arc<CountingProvisioners>) {
    let provisioners = CountingProvisioners::new(store);
    let collaborators = IdentityCollaborators {
        roles: store.clone(),
        role_provisioner: provisioners.clone(),
        users: store.clone(),
        user_provisioner: provisioners.clone(),
    };
    (collaborators, provisioners)
}

async fn role(store: &MemoryIdentityStore, id: &str) -> Option<Role> {
    RoleRepository::find_by_id(store, id).await.unwrap()
}

async fn user(store: &MemoryIdentityStore, name: &str) -> Option<User> {
    UserRepository::find_by_name(store, name).await.unwrap()
}

#[tokio::test]
async fn test_first_run_seeds_role_and_user() {
    let store = Arc::new(MemoryIdentityStore::new());
    let (collaborators, counts) = counted(&store);
    let bootstrap = AdminBootstrap::new(&admin_config(Some("alice"), Some("p@ss")), collaborators);

    let report = bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.role_name, "Admin");
    assert_eq!(report.role, RoleStep::Created { permission_count: 1 });
    assert_eq!(
        report.user,
        UserStep::Created {
            name: "alice".to_string(),
            role: "Admin".to_string()
        }
    );
    assert_eq!(report.outcome(), BootstrapOutcome::CompletedWithUser);
    assert_eq!(counts.role_creates(), 1);
    assert_eq!(counts.user_creates(), 1);

    let admin_role = role(&store, "Admin").await.unwrap();
    assert_eq!(admin_role.permissions, vec!["*".to_string()]);
    assert!(admin_role.grants_all());

    let alice = user(&store, "alice").await.unwrap();
    assert_eq!(alice.roles, vec!["Admin".to_string()]);
    assert!(verify_password("p@ss", &alice.password_hash).await.unwrap());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let store = Arc::new(MemoryIdentityStore::new());
    let config = admin_config(Some("alice"), Some("p@ss"));

    let (collaborators, _) = counted(&store);
    AdminBootstrap::new(&config, collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap();
    let first_user = user(&store, "alice").await.unwrap();

    let (collaborators, counts) = counted(&store);
    let report = AdminBootstrap::new(&config, collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.role, RoleStep::Skipped(SkipReason::AlreadyExists));
    assert_eq!(report.user, UserStep::Skipped(SkipReason::AlreadyExists));
    assert_eq!(report.outcome(), BootstrapOutcome::CompletedRoleOnly);
    assert!(!report.changed_store());
    assert_eq!(counts.role_creates(), 0);
    assert_eq!(counts.user_creates(), 0);

    assert_eq!(store.role_count(), 1);
    assert_eq!(store.user_count(), 1);
    assert_eq!(user(&store, "alice").await.unwrap(), first_user);
}

#[tokio::test]
async fn test_missing_credentials_only_seed_the_role() {
    for (name, password) in [
        (None, None),
        (Some("alice"), None),
        (None, Some("p@ss")),
        (Some("   "), Some("p@ss")),
        (Some("alice"), Some("")),
    ] {
        let store = Arc::new(MemoryIdentityStore::new());
        let (collaborators, counts) = counted(&store);
        let report = AdminBootstrap::new(&admin_config(name, password), collaborators)
            .run(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.user, UserStep::NoCredentials);
        assert_eq!(report.outcome(), BootstrapOutcome::SkippedNoCredentials);
        assert_eq!(counts.role_creates(), 1);
        assert_eq!(counts.user_creates(), 0);
        assert_eq!(store.role_count(), 1);
        assert_eq!(store.user_count(), 0);
    }
}

#[tokio::test]
async fn test_existing_role_is_not_reconciled_and_user_still_created() {
    let store = Arc::new(MemoryIdentityStore::new());
    let seeded = Role {
        id: "Admin".to_string(),
        name: "Administrators".to_string(),
        permissions: vec!["read:workflows".to_string()],
        created_at: Utc::now(),
    };
    RoleRepository::insert(store.as_ref(), &seeded).await.unwrap();

    let (collaborators, counts) = counted(&store);
    let report = AdminBootstrap::new(&admin_config(Some("alice"), Some("p@ss")), collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.role, RoleStep::Skipped(SkipReason::AlreadyExists));
    assert_eq!(report.outcome(), BootstrapOutcome::CompletedWithUser);
    assert_eq!(counts.role_creates(), 0);
    // Configured default is ["*"], but the existing role is left untouched
    assert_eq!(role(&store, "Admin").await.unwrap(), seeded);
    assert_eq!(
        user(&store, "alice").await.unwrap().roles,
        vec!["Admin".to_string()]
    );
}

#[tokio::test]
async fn test_existing_user_role_assignment_is_not_updated() {
    let store = Arc::new(MemoryIdentityStore::new());
    let services = UserService::new(store.clone());
    services
        .create_user(&UserSpec {
            name: "alice".to_string(),
            password: Secret::new("old"),
            roles: vec!["Viewer".to_string()],
        })
        .await
        .unwrap();

    let mut config = admin_config(Some("alice"), Some("new"));
    config.role.name = Some("Operators".to_string());
    let (collaborators, counts) = counted(&store);
    let report = AdminBootstrap::new(&config, collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.role, RoleStep::Created { permission_count: 1 });
    assert_eq!(report.user, UserStep::Skipped(SkipReason::AlreadyExists));
    assert_eq!(counts.user_creates(), 0);

    let alice = user(&store, "alice").await.unwrap();
    assert_eq!(alice.roles, vec!["Viewer".to_string()]);
    assert!(verify_password("old", &alice.password_hash).await.unwrap());
}

#[tokio::test]
async fn test_configured_role_name_and_permissions() {
    let store = Arc::new(MemoryIdentityStore::new());
    let mut config = admin_config(Some("alice"), Some("p@ss"));
    config.role.name = Some("WorkflowAdmins".to_string());
    config.role.permissions = Some(vec![
        "write:workflows".to_string(),
        "read:workflows".to_string(),
    ]);

    let (collaborators, _) = counted(&store);
    let report = AdminBootstrap::new(&config, collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.role_name, "WorkflowAdmins");
    assert_eq!(report.role, RoleStep::Created { permission_count: 2 });
    assert!(role(&store, "Admin").await.is_none());
    let seeded = role(&store, "WorkflowAdmins").await.unwrap();
    assert!(!seeded.grants_all());
    assert_eq!(
        user(&store, "alice").await.unwrap().roles,
        vec!["WorkflowAdmins".to_string()]
    );
}

#[tokio::test]
async fn test_lost_creation_race_is_reported_as_skip() {
    let store = Arc::new(MemoryIdentityStore::new());
    let (collaborators, _) = counted(&store);
    AdminBootstrap::new(&admin_config(Some("alice"), Some("p@ss")), collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    // A second replica whose lookups missed the first replica's writes
    let stale = Arc::new(StaleView(store.clone()));
    let collaborators = IdentityCollaborators::with_services(stale.clone(), stale);
    let report = AdminBootstrap::new(&admin_config(Some("alice"), Some("p@ss")), collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.role, RoleStep::Skipped(SkipReason::CreatedConcurrently));
    assert_eq!(report.user, UserStep::Skipped(SkipReason::CreatedConcurrently));
    assert_eq!(report.outcome(), BootstrapOutcome::CompletedRoleOnly);
    assert_eq!(store.role_count(), 1);
    assert_eq!(store.user_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_replicas_create_exactly_once() {
    let store = Arc::new(MemoryIdentityStore::new());
    let config = admin_config(Some("alice"), Some("p@ss"));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let bootstrap = AdminBootstrap::new(
            &config,
            IdentityCollaborators::with_services(store.clone(), store.clone()),
        );
        handles.push(tokio::spawn(async move {
            bootstrap.run(&CancellationToken::new()).await
        }));
    }

    let mut roles_created = 0;
    let mut users_created = 0;
    for handle in handles {
        let report = handle.await.unwrap().expect("replica run must not fail");
        if matches!(report.role, RoleStep::Created { .. }) {
            roles_created += 1;
        }
        if matches!(report.user, UserStep::Created { .. }) {
            users_created += 1;
        }
    }

    assert_eq!(roles_created, 1);
    assert_eq!(users_created, 1);
    assert_eq!(store.role_count(), 1);
    assert_eq!(store.user_count(), 1);
}

/// Role provisioner that commits the role and then fires the cancellation token
struct CancelAfterRoleCreate {
    inner: RoleService,
    cancel: CancellationToken,
}

#[async_trait]
impl RoleProvisioner for CancelAfterRoleCreate {
    async fn create_role(&self, spec: &RoleSpec) -> Result<Role> {
        let role = self.inner.create_role(spec).await?;
        self.cancel.cancel();
        Ok(role)
    }
}

#[tokio::test]
async fn test_cancellation_keeps_committed_role() {
    let store = Arc::new(MemoryIdentityStore::new());
    let cancel = CancellationToken::new();
    let (mut collaborators, counts) = counted(&store);
    collaborators.role_provisioner = Arc::new(CancelAfterRoleCreate {
        inner: RoleService::new(store.clone()),
        cancel: cancel.clone(),
    });

    let err = AdminBootstrap::new(&admin_config(Some("alice"), Some("p@ss")), collaborators)
        .run(&cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.step(), BootstrapStep::UserLookup);
    assert_eq!(store.role_count(), 1);
    assert_eq!(store.user_count(), 0);
    assert_eq!(counts.user_creates(), 0);
}

#[tokio::test]
async fn test_bootstrap_as_startup_task() {
    let store = Arc::new(MemoryIdentityStore::new());
    let bootstrap = AdminBootstrap::new(
        &admin_config(Some("alice"), Some("p@ss")),
        IdentityCollaborators::with_services(store.clone(), store.clone()),
    );

    let mut sequencer = StartupSequencer::new(FailurePolicy::Abort, Duration::from_secs(30));
    sequencer.register(Arc::new(bootstrap));
    let summary = sequencer.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.completed, vec!["admin-bootstrap"]);
    assert!(summary.failed.is_empty());
    assert!(user(&store, "alice").await.is_some());
}

#[tokio::test]
async fn test_invalid_role_name_surfaces_as_role_create_failure() {
    let store = Arc::new(MemoryIdentityStore::new());
    let (collaborators, counts) = counted(&store);
    let mut config = admin_config(Some("alice"), Some("p@ss"));
    config.role.name = Some("Ad\u{1b}min".to_string());

    let err = AdminBootstrap::new(&config, collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.step(), BootstrapStep::RoleCreate);
    assert_eq!(counts.user_creates(), 0);
    assert_eq!(store.role_count(), 0);
}

#[tokio::test]
async fn test_long_generated_password_is_seeded() {
    let store = Arc::new(MemoryIdentityStore::new());
    let password = "k3Y-".repeat(50);
    let (collaborators, _) = counted(&store);

    let report = AdminBootstrap::new(&admin_config(Some("alice"), Some(&password)), collaborators)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome(), BootstrapOutcome::CompletedWithUser);
    let alice = user(&store, "alice").await.unwrap();
    assert!(verify_password(&password, &alice.password_hash).await.unwrap());
}
