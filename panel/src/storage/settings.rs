//! Settings file management

use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::logs::LogLevel;

/// Panel settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily-rotated log files into this directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Domain under which instances are served (`<hostname>.<public_host>`).
    /// Used when a request carries no `Origin` header.
    #[serde(default = "default_public_host")]
    pub public_host: String,

    #[serde(default)]
    pub github: GithubSettings,

    #[serde(default)]
    pub deployments: DeploymentSettings,

    #[serde(default)]
    pub reconcile_worker: ReconcileWorkerSettings,

    #[serde(default)]
    pub mysql: MysqlSettings,

    #[serde(default)]
    pub dockerhub: DockerHubSettings,

    #[serde(default)]
    pub compose: ComposeSettings,

    /// Where generated files live
    #[serde(default)]
    pub paths: PathSettings,
}

fn default_true() -> bool {
    true
}

fn default_public_host() -> String {
    "test.specifysystems.org".to_string()
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|value| !value.is_empty())
        .map(SecretString::from))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            public_host: default_public_host(),
            github: GithubSettings::default(),
            deployments: DeploymentSettings::default(),
            reconcile_worker: ReconcileWorkerSettings::default(),
            mysql: MysqlSettings::default(),
            dockerhub: DockerHubSettings::default(),
            compose: ComposeSettings::default(),
            paths: PathSettings::default(),
        }
    }
}

impl Settings {
    /// Secrets and connection details may come from the environment, which
    /// takes precedence over the settings file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(host) = get("MYSQL_HOST") {
            self.mysql.host = host;
        }
        if let Some(username) = get("MYSQL_USERNAME") {
            self.mysql.username = username;
        }
        if let Some(password) = get("MYSQL_PASSWORD") {
            self.mysql.password = Some(SecretString::from(password));
        }
        if let Some(client_id) = get("GITHUB_CLIENT_ID") {
            self.github.client_id = Some(client_id);
        }
        if let Some(client_secret) = get("GITHUB_CLIENT_SECRET") {
            self.github.client_secret = Some(SecretString::from(client_secret));
        }
        if let Some(token) = get("GITHUB_PERSONAL_TOKEN") {
            self.github.personal_token = Some(SecretString::from(token));
        }
        if let Some(secret_key) = get("SECRET_KEY") {
            self.compose.secret_key = Some(SecretString::from(secret_key));
        }
        if let Some(url) = get("ASSET_SERVER_URL") {
            self.compose.asset_server_url = url;
        }
        if let Some(key) = get("ASSET_SERVER_KEY") {
            self.compose.asset_server_key = Some(SecretString::from(key));
        }
        if let Some(collection) = get("ASSET_SERVER_COLLECTION") {
            self.compose.asset_server_collection = collection;
        }
        if let Some(host) = get("REPORT_RUNNER_HOST") {
            self.compose.report_runner_host = host;
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// GitHub organization, repository and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct GithubSettings {
    #[serde(default = "default_organization")]
    pub organization: String,

    #[serde(default = "default_repository")]
    pub repository: String,

    /// Pull requests waiting on review from these teams get auto-deployed
    #[serde(default = "default_target_teams")]
    pub target_teams: Vec<String>,

    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,

    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub client_secret: Option<SecretString>,

    /// Token used by the webhook and the reconcile worker
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub personal_token: Option<SecretString>,
}

fn default_organization() -> String {
    "specify".to_string()
}

fn default_repository() -> String {
    "specify7".to_string()
}

fn default_target_teams() -> Vec<String> {
    vec!["UX Testing".to_string(), "Testing".to_string()]
}

fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_oauth_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            repository: default_repository(),
            target_teams: default_target_teams(),
            graphql_url: default_graphql_url(),
            oauth_url: default_oauth_url(),
            client_id: None,
            client_secret: None,
            personal_token: None,
        }
    }
}

/// Reconciliation limits
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentSettings {
    /// Maximum number of auto-deployed instances kept at once
    #[serde(default = "default_max_auto_deployments")]
    pub max_auto_deployments: usize,

    /// Auto-deployed instances may be garbage collected after this many seconds
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Manually added instances may be garbage collected after this many seconds
    #[serde(default = "default_custom_stale_after")]
    pub custom_stale_after_secs: u64,
}

fn default_max_auto_deployments() -> usize {
    6
}

fn default_stale_after() -> u64 {
    60 * 60 * 24 * 2
}

fn default_custom_stale_after() -> u64 {
    2 * default_stale_after()
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            max_auto_deployments: default_max_auto_deployments(),
            stale_after_secs: default_stale_after(),
            custom_stale_after_secs: default_custom_stale_after(),
        }
    }
}

/// Periodic reconciliation
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileWorkerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
}

fn default_reconcile_interval() -> u64 {
    600
}

impl Default for ReconcileWorkerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reconcile_interval(),
        }
    }
}

/// MySQL server holding the test databases
#[derive(Debug, Clone, Deserialize)]
pub struct MysqlSettings {
    #[serde(default = "default_mysql_host")]
    pub host: String,

    #[serde(default = "default_mysql_port")]
    pub port: u16,

    #[serde(default = "default_mysql_username")]
    pub username: String,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
}

fn default_mysql_host() -> String {
    "mariadb".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_mysql_username() -> String {
    "root".to_string()
}

impl Default for MysqlSettings {
    fn default() -> Self {
        Self {
            host: default_mysql_host(),
            port: default_mysql_port(),
            username: default_mysql_username(),
            password: None,
        }
    }
}

/// DockerHub repository namespace for image tags
#[derive(Debug, Clone, Deserialize)]
pub struct DockerHubSettings {
    #[serde(default = "default_dockerhub_url")]
    pub base_url: String,

    #[serde(default = "default_dockerhub_namespace")]
    pub namespace: String,

    /// Image whose tags are the available schema versions
    #[serde(default = "default_schema_image")]
    pub schema_image: String,
}

fn default_dockerhub_url() -> String {
    "https://hub.docker.com".to_string()
}

fn default_dockerhub_namespace() -> String {
    "specifyconsortium".to_string()
}

fn default_schema_image() -> String {
    "specify6-service".to_string()
}

impl Default for DockerHubSettings {
    fn default() -> Self {
        Self {
            base_url: default_dockerhub_url(),
            namespace: default_dockerhub_namespace(),
            schema_image: default_schema_image(),
        }
    }
}

/// Values injected into every generated instance service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeSettings {
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub secret_key: Option<SecretString>,

    #[serde(default)]
    pub asset_server_url: String,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub asset_server_key: Option<SecretString>,

    #[serde(default)]
    pub asset_server_collection: String,

    #[serde(default)]
    pub report_runner_host: String,
}

/// Locations of the state file and generated configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PathSettings {
    /// Holds `configuration.json` and `docker-compose.yml`
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Holds the generated `nginx.conf`
    #[serde(default = "default_nginx_conf_dir")]
    pub nginx_conf_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("../state")
}

fn default_nginx_conf_dir() -> PathBuf {
    PathBuf::from("../nginx.conf.d")
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            nginx_conf_dir: default_nginx_conf_dir(),
        }
    }
}
