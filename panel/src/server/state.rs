//! Server state

use std::sync::Arc;

use secrecy::SecretString;

use crate::database::Databases;
use crate::deploy::store::StateStore;
use crate::http::dockerhub::DockerHubClient;
use crate::http::github::GithubClientExt;

/// Server state shared across handlers
pub struct ServerState {
    pub github: Arc<dyn GithubClientExt>,
    pub store: Arc<StateStore>,
    pub databases: Arc<Databases>,
    pub dockerhub: Arc<DockerHubClient>,

    /// Token the webhook reconciles with
    pub personal_token: Option<SecretString>,

    /// Instance domain used when a request has no `Origin` header
    pub public_host: String,
}

impl ServerState {
    pub fn new(
        github: Arc<dyn GithubClientExt>,
        store: Arc<StateStore>,
        databases: Arc<Databases>,
        dockerhub: Arc<DockerHubClient>,
        personal_token: Option<SecretString>,
        public_host: String,
    ) -> Self {
        Self {
            github,
            store,
            databases,
            dockerhub,
            personal_token,
            public_host,
        }
    }
}
