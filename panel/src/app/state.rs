//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::database::Databases;
use crate::deploy::source::LiveSource;
use crate::deploy::store::StateStore;
use crate::errors::PanelError;
use crate::http::client::HttpClient;
use crate::http::dockerhub::DockerHubClient;
use crate::http::github::{GithubClient, GithubClientExt};
use crate::server::state::ServerState;

/// Main application state
pub struct AppState {
    /// GitHub client for authentication and pull requests
    pub github: Arc<dyn GithubClientExt>,

    /// DockerHub client for schema versions
    pub dockerhub: Arc<DockerHubClient>,

    /// Test database management
    pub databases: Arc<Databases>,

    /// Deployment state
    pub store: Arc<StateStore>,
}

impl AppState {
    /// Initialize application state
    pub async fn init(options: &AppOptions) -> Result<Self, PanelError> {
        info!("Initializing application state...");

        options.layout.setup().await?;

        let http_client = HttpClient::new()?;
        let github: Arc<dyn GithubClientExt> = Arc::new(GithubClient::new(
            http_client.clone(),
            options.github.clone(),
        ));
        let dockerhub = Arc::new(DockerHubClient::new(http_client, options.dockerhub.clone()));
        let databases = Arc::new(Databases::new(&options.mysql));

        let source = Arc::new(LiveSource::new(
            github.clone(),
            databases.clone(),
            dockerhub.clone(),
        ));
        let store = Arc::new(StateStore::new(
            &options.layout,
            source,
            options.auto_deploy.clone(),
            options.compose.clone(),
        ));

        Ok(Self {
            github,
            dockerhub,
            databases,
            store,
        })
    }

    /// State shared with the HTTP handlers
    pub fn server_state(&self, options: &AppOptions) -> ServerState {
        ServerState::new(
            self.github.clone(),
            self.store.clone(),
            self.databases.clone(),
            self.dockerhub.clone(),
            options.personal_token().cloned(),
            options.public_host.clone(),
        )
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), PanelError> {
        info!("Shutting down application state...");
        self.databases.queries().pool().close().await;
        Ok(())
    }
}
