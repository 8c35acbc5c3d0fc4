//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::deploy::auto::AutoDeployOptions;
use crate::deploy::compose::ComposeEnvironment;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{DockerHubSettings, GithubSettings, MysqlSettings, Settings};
use crate::workers::reconciler;

/// Main application options
#[derive(Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Server configuration
    pub server: ServerOptions,

    /// Instance domain used when a request has no `Origin` header
    pub public_host: String,

    pub github: GithubSettings,
    pub mysql: MysqlSettings,
    pub dockerhub: DockerHubSettings,

    /// Auto-deployment limits
    pub auto_deploy: AutoDeployOptions,

    /// Values passed to the generated containers
    pub compose: ComposeEnvironment,

    /// Enable the reconciler worker (requires a personal token)
    pub enable_reconciler: bool,

    /// Reconciler worker options
    pub reconciler: reconciler::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), StorageLayout::default())
    }
}

impl AppOptions {
    /// Options for a settings file, with state paths resolved by `layout`
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            layout,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            public_host: settings.public_host.clone(),
            github: settings.github.clone(),
            mysql: settings.mysql.clone(),
            dockerhub: settings.dockerhub.clone(),
            auto_deploy: AutoDeployOptions::from(&settings.deployments),
            compose: ComposeEnvironment::from_settings(settings),
            enable_reconciler: settings.reconcile_worker.enabled,
            reconciler: reconciler::Options {
                interval: Duration::from_secs(settings.reconcile_worker.interval_secs),
                host: settings.public_host.clone(),
                ..Default::default()
            },
        }
    }

    pub fn personal_token(&self) -> Option<&SecretString> {
        self.github.personal_token.as_ref()
    }
}

impl std::fmt::Debug for AppOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppOptions")
            .field("layout", &self.layout)
            .field("server", &self.server)
            .field("public_host", &self.public_host)
            .field("organization", &self.github.organization)
            .field("repository", &self.github.repository)
            .field("mysql_host", &self.mysql.host)
            .field("auto_deploy", &self.auto_deploy)
            .field("enable_reconciler", &self.enable_reconciler)
            .finish_non_exhaustive()
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}
