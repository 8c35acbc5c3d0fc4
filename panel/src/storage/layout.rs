//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::settings::PathSettings;

/// Default directory holding `settings.json`
pub const DEFAULT_CONFIG_DIR: &str = "/etc/test-panel";

/// Storage layout for the panel
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Directory holding the settings file
    pub config_dir: PathBuf,

    /// Directory holding the deployment state and compose file
    pub state_dir: PathBuf,

    /// Directory holding the generated nginx config
    pub nginx_conf_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(
        config_dir: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
        nginx_conf_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config_dir: config_dir.into(),
            state_dir: state_dir.into(),
            nginx_conf_dir: nginx_conf_dir.into(),
        }
    }

    /// Layout for a config directory, with state paths taken from settings
    pub fn from_settings(config_dir: impl Into<PathBuf>, paths: &PathSettings) -> Self {
        Self::new(config_dir, paths.state_dir.clone(), paths.nginx_conf_dir.clone())
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.config_dir.join("settings.json"))
    }

    /// Get the deployment state file path
    pub fn configuration_file(&self) -> File {
        File::new(self.state_dir.join("configuration.json"))
    }

    /// Get the generated docker compose file path
    pub fn docker_compose_file(&self) -> File {
        File::new(self.state_dir.join("docker-compose.yml"))
    }

    /// Get the generated nginx config path
    pub fn nginx_config_file(&self) -> File {
        File::new(self.nginx_conf_dir.join("nginx.conf"))
    }

    /// Get the state directory
    pub fn state_dir(&self) -> Dir {
        Dir::new(self.state_dir.clone())
    }

    /// Get the nginx config directory
    pub fn nginx_conf_dir(&self) -> Dir {
        Dir::new(self.nginx_conf_dir.clone())
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), crate::errors::PanelError> {
        self.state_dir().create().await?;
        self.nginx_conf_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::from_settings(DEFAULT_CONFIG_DIR, &PathSettings::default())
    }
}
