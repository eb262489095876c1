use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use std::fmt;
use std::path::Path;

/// Role identifier seeded when `ELSA_ADMIN_ROLE_NAME` is not configured
pub const DEFAULT_ADMIN_ROLE: &str = "Admin";

/// Permission granting everything; interpreted by the authorization layer
pub const WILDCARD_PERMISSION: &str = "*";

/// Environment variable prefix for every configuration key
pub const ENV_PREFIX: &str = "ELSA";

/// Application configuration
///
/// Environment keys are derived from the field path with `_` as separator,
/// so only single-word field names can be overridden from the environment
/// (`ELSA_ADMIN_ROLE_NAME` -> `admin.role.name`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub startup: StartupConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; empty selects the in-memory identity store
    pub url: String,
    /// Maximum pool size
    pub connections: u32,
    /// Connect/acquire timeout in seconds
    pub timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connections: 5,
            timeout: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Whether the host waits for startup tasks before reporting ready
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupMode {
    /// Run startup tasks to completion before anything else
    #[default]
    Blocking,
    /// Run startup tasks concurrently with the rest of the process
    Background,
}

/// What the host does when a startup task fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail process startup
    Abort,
    /// Log the failure and keep going
    #[default]
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    pub mode: StartupMode,
    pub policy: FailurePolicy,
    /// Per-task deadline in seconds
    pub timeout: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            mode: StartupMode::default(),
            policy: FailurePolicy::default(),
            timeout: 30,
        }
    }
}

/// A credential read from configuration
///
/// Formatting never reveals the value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Administrator bootstrap settings (`ELSA_ADMIN_*`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// `ELSA_ADMIN_USER`
    pub user: Option<String>,
    /// `ELSA_ADMIN_PASSWORD`
    pub password: Option<Secret>,
    pub role: AdminRoleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminRoleConfig {
    /// `ELSA_ADMIN_ROLE_NAME`
    pub name: Option<String>,
    /// `ELSA_ADMIN_ROLE_PERMISSIONS` (comma separated in the environment)
    #[serde(deserialize_with = "permission_list")]
    pub permissions: Option<Vec<String>>,
}

/// Accept either a sequence (config files) or a comma separated string
/// (environment variables) for the permission list
fn permission_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PermissionListVisitor;

    impl<'de> Visitor<'de> for PermissionListVisitor {
        type Value = Option<Vec<String>>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of permissions or a comma separated string")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(ToString::to_string)
                    .collect(),
            ))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut permissions = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(permission) = seq.next_element::<String>()? {
                permissions.push(permission);
            }
            Ok(Some(permissions))
        }
    }

    deserializer.deserialize_option(PermissionListVisitor)
}

/// Credentials for the administrator account, present only when both halves
/// are configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: Secret,
}

/// Bootstrap settings with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAdmin {
    pub role_name: String,
    pub permissions: Vec<String>,
    pub credentials: Option<AdminCredentials>,
}

impl AdminConfig {
    /// Apply defaults and normalization.
    ///
    /// A blank role name falls back to `Admin`; a missing or empty permission
    /// list falls back to `["*"]`. Permissions are trimmed, deduplicated and
    /// sorted. The password is kept verbatim.
    #[must_use]
    pub fn resolve(&self) -> ResolvedAdmin {
        let role_name = self
            .role
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ADMIN_ROLE)
            .to_string();

        let mut permissions: Vec<String> = self
            .role
            .permissions
            .iter()
            .flatten()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect();
        permissions.sort();
        permissions.dedup();
        if permissions.is_empty() {
            permissions.push(WILDCARD_PERMISSION.to_string());
        }

        let username = self
            .user
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let password = self.password.as_ref().filter(|p| !p.is_blank());
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(AdminCredentials {
                username: username.to_string(),
                password: password.clone(),
            }),
            _ => None,
        };

        ResolvedAdmin {
            role_name,
            permissions,
            credentials,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        builder = builder.add_source(Self::environment());

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Environment source (`ELSA_ADMIN_USER` -> `admin.user`, etc.)
    ///
    /// Values are left as strings so a numeric password keeps its exact
    /// text. The permission list is split on commas when deserialized.
    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("_")
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Whether a database URL is configured
    #[must_use]
    pub fn has_database(&self) -> bool {
        !self.database.url.trim().is_empty()
    }

    /// Check configuration for values that can never work.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            errors.push(format!("logging.level: unknown level '{}'", self.logging.level));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format: expected 'json' or 'pretty', got '{}'",
                self.logging.format
            ));
        }
        if self.startup.timeout == 0 {
            errors.push("startup.timeout: must be greater than zero".to_string());
        }
        if self.has_database() && self.database.connections == 0 {
            errors.push("database.connections: must be greater than zero".to_string());
        }

        let resolved = self.admin.resolve();
        if resolved.role_name.chars().any(char::is_control) {
            errors.push("admin.role.name: must not contain control characters".to_string());
        }
        if resolved
            .permissions
            .iter()
            .any(|p| p.chars().any(char::is_control))
        {
            errors.push("admin.role.permissions: must not contain control characters".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
