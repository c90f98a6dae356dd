//! Stack configuration management.
//!
//! Describes which images run, which host ports they publish, what the two
//! persistent volumes are called and where the service definition and the
//! environment file live on disk. Configuration is persisted as TOML and
//! every field has a default, so an empty file (or no file) is valid.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CsResult, StackError};
use crate::platform::Platform;

/// Top-level stack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    /// Project naming and location.
    #[serde(default)]
    pub project: ProjectConfig,

    /// How the orchestration tool is invoked.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Chat application container.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Object store container.
    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    /// Identity provider container.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Relational store container.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Names of the two persistent volumes.
    #[serde(default)]
    pub volumes: VolumesConfig,

    /// First-run setup parameters.
    #[serde(default)]
    pub setup: SetupConfig,

    /// Endpoint readiness probing.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Project naming and location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Compose project name; prefixes container, network and volume names.
    #[serde(default = "default_project_name")]
    pub name: String,

    /// Directory holding the service definition and environment file.
    /// Empty means the current working directory.
    #[serde(default)]
    pub directory: String,
}

/// Orchestration tool invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Container CLI binary (`docker`, `podman`, ...).
    #[serde(default = "default_program")]
    pub program: String,

    /// Service definition file name, relative to the project directory.
    #[serde(default = "default_compose_file")]
    pub compose_file: String,

    /// Environment file name, relative to the project directory.
    #[serde(default = "default_env_file")]
    pub env_file: String,

    /// Re-render the service definition from this config before every `up`.
    /// Disable to manage the compose file by hand.
    #[serde(default = "default_true")]
    pub render_compose: bool,
}

/// Chat application container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_service")]
    pub service_name: String,

    #[serde(default = "default_chat_image")]
    pub image: String,

    /// Host port the chat UI is published on.
    #[serde(default = "default_chat_port")]
    pub port: u16,

    /// Port the chat application listens on inside its container.
    #[serde(default = "default_chat_port")]
    pub container_port: u16,

    /// Mount point of the application data volume.
    #[serde(default = "default_chat_data_path")]
    pub data_path: String,

    /// Public URL users reach the chat app on. Empty means `http://localhost:<port>`.
    #[serde(default)]
    pub public_url: String,

    /// Path probed by `status` to decide whether the app is up.
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

/// Object store container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default = "default_object_store_service")]
    pub service_name: String,

    #[serde(default = "default_object_store_image")]
    pub image: String,

    /// Host port of the S3 API.
    #[serde(default = "default_object_store_api_port")]
    pub api_port: u16,

    /// Host port of the admin console.
    #[serde(default = "default_object_store_console_port")]
    pub console_port: u16,
}

/// Identity provider container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_service")]
    pub service_name: String,

    #[serde(default = "default_identity_image")]
    pub image: String,

    /// Host port of the identity console (also its API).
    #[serde(default = "default_identity_port")]
    pub port: u16,
}

/// Relational store container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_service")]
    pub service_name: String,

    #[serde(default = "default_database_image")]
    pub image: String,

    /// Mount point of the database data volume.
    #[serde(default = "default_database_data_path")]
    pub data_path: String,

    /// Database user written into the environment file by `init`.
    #[serde(default = "default_database_user")]
    pub user: String,

    /// Database name written into the environment file by `init`.
    #[serde(default = "default_database_name")]
    pub name: String,
}

/// Names of the persistent volumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumesConfig {
    /// Chat application data (settings, documents, conversation history).
    #[serde(default = "default_app_volume")]
    pub app_data: String,

    /// Relational store data.
    #[serde(default = "default_db_volume")]
    pub db_data: String,
}

/// First-run setup parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Bucket the chat application stores uploads in.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Object-store client image used for the one-shot bucket step.
    #[serde(default = "default_mc_image")]
    pub mc_image: String,

    /// Path of the OAuth redirect URI, appended to the chat public URL.
    #[serde(default = "default_redirect_path")]
    pub redirect_path: String,

    /// Application name to register in the identity console.
    #[serde(default = "default_project_name")]
    pub application_name: String,

    /// Organization the application is registered under.
    #[serde(default = "default_organization")]
    pub organization: String,
}

/// Endpoint readiness probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_probe_timeout")]
    pub timeout_ms: u64,

    /// Overall deadline for `status --wait`, in seconds.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// First delay between polls, doubled after each miss.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Cap on the delay between polls.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_true() -> bool {
    true
}

fn default_project_name() -> String {
    "chatstack".to_string()
}

fn default_program() -> String {
    "docker".to_string()
}

fn default_compose_file() -> String {
    "docker-compose.yml".to_string()
}

fn default_env_file() -> String {
    ".env".to_string()
}

fn default_chat_service() -> String {
    "chat".to_string()
}

fn default_chat_image() -> String {
    "ghcr.io/chatstack/chat:latest".to_string()
}

fn default_chat_port() -> u16 {
    3000
}

fn default_chat_data_path() -> String {
    "/app/data".to_string()
}

fn default_health_path() -> String {
    "/".to_string()
}

fn default_object_store_service() -> String {
    "object-store".to_string()
}

fn default_object_store_image() -> String {
    "minio/minio:latest".to_string()
}

fn default_object_store_api_port() -> u16 {
    9000
}

fn default_object_store_console_port() -> u16 {
    9001
}

fn default_identity_service() -> String {
    "identity".to_string()
}

fn default_identity_image() -> String {
    "casbin/casdoor:latest".to_string()
}

fn default_identity_port() -> u16 {
    8000
}

fn default_database_service() -> String {
    "database".to_string()
}

fn default_database_image() -> String {
    "postgres:16".to_string()
}

fn default_database_data_path() -> String {
    "/var/lib/postgresql/data".to_string()
}

fn default_database_user() -> String {
    "chatstack".to_string()
}

fn default_database_name() -> String {
    "chatstack".to_string()
}

fn default_app_volume() -> String {
    "chat-data".to_string()
}

fn default_db_volume() -> String {
    "db-data".to_string()
}

fn default_bucket() -> String {
    "chat-files".to_string()
}

fn default_mc_image() -> String {
    "minio/mc:latest".to_string()
}

fn default_redirect_path() -> String {
    "/callback".to_string()
}

fn default_organization() -> String {
    "built-in".to_string()
}

fn default_probe_timeout() -> u64 {
    5_000
}

fn default_max_wait() -> u64 {
    180
}

fn default_base_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            directory: String::new(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            compose_file: default_compose_file(),
            env_file: default_env_file(),
            render_compose: true,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            service_name: default_chat_service(),
            image: default_chat_image(),
            port: default_chat_port(),
            container_port: default_chat_port(),
            data_path: default_chat_data_path(),
            public_url: String::new(),
            health_path: default_health_path(),
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            service_name: default_object_store_service(),
            image: default_object_store_image(),
            api_port: default_object_store_api_port(),
            console_port: default_object_store_console_port(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            service_name: default_identity_service(),
            image: default_identity_image(),
            port: default_identity_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            service_name: default_database_service(),
            image: default_database_image(),
            data_path: default_database_data_path(),
            user: default_database_user(),
            name: default_database_name(),
        }
    }
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self {
            app_data: default_app_volume(),
            db_data: default_db_volume(),
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            mc_image: default_mc_image(),
            redirect_path: default_redirect_path(),
            application_name: default_project_name(),
            organization: default_organization(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout(),
            max_wait_secs: default_max_wait(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl StackConfig {
    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> CsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: StackConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> CsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| StackError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration file path.
    pub fn default_config_path() -> CsResult<PathBuf> {
        Ok(Platform::config_dir()?.join("config.toml"))
    }

    /// Directory holding the service definition and environment file.
    pub fn project_dir(&self) -> CsResult<PathBuf> {
        if self.project.directory.is_empty() {
            Ok(std::env::current_dir()?)
        } else {
            Ok(PathBuf::from(&self.project.directory))
        }
    }

    /// Absolute path of the service definition file.
    pub fn compose_path(&self) -> CsResult<PathBuf> {
        Ok(self.project_dir()?.join(&self.orchestrator.compose_file))
    }

    /// Absolute path of the environment file.
    pub fn env_path(&self) -> CsResult<PathBuf> {
        Ok(self.project_dir()?.join(&self.orchestrator.env_file))
    }

    /// Effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> CsResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Platform::log_dir()
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Name of the network the orchestration tool creates for the project.
    pub fn network_name(&self) -> String {
        format!("{}_default", self.project.name)
    }

    /// Name a volume ends up with on the host (`<project>_<volume>`).
    pub fn qualified_volume_name(&self, volume: &str) -> String {
        format!("{}_{}", self.project.name, volume)
    }

    /// URL users open to reach the chat application.
    pub fn chat_public_url(&self) -> String {
        let configured = sanitize_url(&self.chat.public_url);
        if configured.is_empty() {
            format!("http://localhost:{}", self.chat.port)
        } else {
            configured
        }
    }

    /// The single redirect URI to register with the identity provider.
    pub fn redirect_uri(&self) -> String {
        let path = self.setup.redirect_path.trim();
        if path.starts_with('/') {
            format!("{}{path}", self.chat_public_url())
        } else {
            format!("{}/{path}", self.chat_public_url())
        }
    }

    /// URL of the identity provider console on the host.
    pub fn identity_console_url(&self) -> String {
        format!("http://localhost:{}", self.identity.port)
    }

    /// URL of the object-store console on the host.
    pub fn object_store_console_url(&self) -> String {
        format!("http://localhost:{}", self.object_store.console_port)
    }

    /// URL containers use to reach the object-store API.
    pub fn object_store_internal_url(&self) -> String {
        format!("http://{}:9000", self.object_store.service_name)
    }
}

/// Normalize a URL typed by a human.
///
/// Strips surrounding quotes and whitespace, adds `http://` when no scheme
/// is given, and drops trailing slashes.
pub fn sanitize_url(address: &str) -> String {
    let trimmed = address.trim().trim_matches('"').trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    with_scheme.trim_end_matches('/').to_string()
}

/// Thread-safe configuration holder shared by command handlers.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<StackConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: StackConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, StackConfig> {
        self.inner.read().await
    }

    /// Clone the current configuration out of the lock.
    pub async fn snapshot(&self) -> StackConfig {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StackConfig::default();
        assert_eq!(config.project.name, "chatstack");
        assert_eq!(config.orchestrator.program, "docker");
        assert!(config.orchestrator.render_compose);
        assert_eq!(config.volumes.app_data, "chat-data");
        assert_eq!(config.volumes.db_data, "db-data");
        assert_eq!(config.chat.port, 3000);
    }

    #[test]
    fn test_empty_toml_is_valid() {
        let config: StackConfig = toml::from_str("").unwrap();
        assert_eq!(config.identity.port, 8000);
        assert_eq!(config.object_store.console_port, 9001);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config: StackConfig = toml::from_str(
            r#"
            [chat]
            port = 8080
            public_url = "chat.example.com/"
            "#,
        )
        .unwrap();
        assert_eq!(config.chat.port, 8080);
        assert_eq!(config.chat.container_port, 3000);
        assert_eq!(config.chat_public_url(), "http://chat.example.com");
    }

    #[test]
    fn test_stale_database_port_is_ignored() {
        let config: StackConfig = toml::from_str(
            r#"
            [database]
            port = 6543
            name = "chat"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.name, "chat");
    }

    #[test]
    fn test_redirect_uri() {
        let mut config = StackConfig::default();
        assert_eq!(config.redirect_uri(), "http://localhost:3000/callback");
        config.setup.redirect_path = "auth/done".into();
        assert_eq!(config.redirect_uri(), "http://localhost:3000/auth/done");
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(sanitize_url("  \"https://example.com/\"  "), "https://example.com");
        assert_eq!(sanitize_url("10.0.0.5:3000"), "http://10.0.0.5:3000");
        assert_eq!(sanitize_url(""), "");
    }

    #[test]
    fn test_qualified_names() {
        let config = StackConfig::default();
        assert_eq!(config.network_name(), "chatstack_default");
        assert_eq!(config.qualified_volume_name("db-data"), "chatstack_db-data");
    }

    #[test]
    fn test_project_paths() {
        let mut config = StackConfig::default();
        config.project.directory = "/srv/stack".into();
        assert_eq!(
            config.compose_path().unwrap(),
            PathBuf::from("/srv/stack/docker-compose.yml")
        );
        assert_eq!(config.env_path().unwrap(), PathBuf::from("/srv/stack/.env"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = StackConfig::default();
        config.setup.bucket = "uploads".into();
        config.save_to_file(&path).unwrap();

        let loaded = StackConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.setup.bucket, "uploads");
    }
}
