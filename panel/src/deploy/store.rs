//! Deployment state persistence and generated configuration

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::deploy::auto::{auto_deploy_pull_requests, AutoDeployOptions, AutoDeploySource};
use crate::deploy::compose::{create_docker_config, ComposeEnvironment};
use crate::deploy::formalize::formalize_state;
use crate::deploy::nginx::create_nginx_config;
use crate::errors::PanelError;
use crate::filesys::file::File;
use crate::models::deployment::{ActiveDeployment, Deployment};
use crate::models::user::User;
use crate::storage::layout::StorageLayout;
use crate::utils::{now_millis, sha256_hash};

/// Owns `configuration.json` and the files generated from it.
///
/// Every read-modify-write cycle runs under one lock, so concurrent requests
/// within the process never overwrite each other's changes.
pub struct StateStore {
    configuration_file: File,
    nginx_config_file: File,
    docker_compose_file: File,
    source: Arc<dyn AutoDeploySource>,
    options: AutoDeployOptions,
    environment: ComposeEnvironment,
    lock: Mutex<()>,
}

impl StateStore {
    pub fn new(
        layout: &StorageLayout,
        source: Arc<dyn AutoDeploySource>,
        options: AutoDeployOptions,
        environment: ComposeEnvironment,
    ) -> Self {
        Self {
            configuration_file: layout.configuration_file(),
            nginx_config_file: layout.nginx_config_file(),
            docker_compose_file: layout.docker_compose_file(),
            source,
            options,
            environment,
            lock: Mutex::new(()),
        }
    }

    /// Stored deployments. A missing state file is created empty.
    pub async fn get_state(&self) -> Result<Vec<Deployment>, PanelError> {
        let _guard = self.lock.lock().await;
        self.read_state().await
    }

    /// Replace the state with `deployments` and regenerate the configuration
    pub async fn set_state(
        &self,
        deployments: Vec<Deployment>,
        user: &User,
        host: &str,
        auto_deploy: bool,
    ) -> Result<Vec<ActiveDeployment>, PanelError> {
        let _guard = self.lock.lock().await;
        self.apply(deployments, user, host, auto_deploy).await
    }

    /// Record that the deployment at `index` was just used
    pub async fn ping(
        &self,
        index: usize,
        user: &User,
        host: &str,
    ) -> Result<Vec<ActiveDeployment>, PanelError> {
        let _guard = self.lock.lock().await;
        let mut state = self.read_state().await?;
        let deployment = state
            .get_mut(index)
            .ok_or_else(|| PanelError::ValidationError("Invalid index".to_string()))?;
        deployment.accessed_at = Some(now_millis());
        debug!("Deployment {} accessed", index);

        self.apply(state, user, host, false).await
    }

    /// Re-run the auto-deployment over the stored state
    pub async fn reconcile(
        &self,
        user: &User,
        host: &str,
    ) -> Result<Vec<ActiveDeployment>, PanelError> {
        let _guard = self.lock.lock().await;
        let state = self.read_state().await?;
        self.apply(state, user, host, true).await
    }

    async fn read_state(&self) -> Result<Vec<Deployment>, PanelError> {
        if !self.configuration_file.exists().await {
            info!(
                "Creating empty state file at {}",
                self.configuration_file.path().display()
            );
            self.configuration_file
                .write_json(&Vec::<Deployment>::new())
                .await?;
        }

        let contents = self.configuration_file.read_string().await?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    async fn apply(
        &self,
        deployments: Vec<Deployment>,
        user: &User,
        host: &str,
        auto_deploy: bool,
    ) -> Result<Vec<ActiveDeployment>, PanelError> {
        let previous = self.read_state().await?;
        let now = now_millis();

        let formalized = formalize_state(
            deployments,
            Some(&previous),
            self.options.max_auto_deployments,
            now,
        );
        let state = auto_deploy_pull_requests(
            formalized,
            user,
            auto_deploy,
            self.source.as_ref(),
            &self.options,
            now,
        )
        .await?;

        self.configuration_file.write_json(&state).await?;

        let nginx_config = create_nginx_config(&state, host);
        self.nginx_config_file
            .write_atomic(nginx_config.as_bytes())
            .await?;

        let docker_config = create_docker_config(
            &state,
            &sha256_hash(nginx_config.as_bytes()),
            &self.environment,
        );
        let current = self.docker_compose_file.read_string_or_empty().await?;
        if current != docker_config {
            info!("Docker compose configuration changed");
            self.docker_compose_file
                .write_atomic(docker_config.as_bytes())
                .await?;
        }

        info!("State saved with {} deployments", state.len());
        Ok(state)
    }
}
