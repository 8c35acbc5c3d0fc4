//! Live inputs of the auto-deployment: GitHub, the database server and
//! DockerHub

use std::sync::Arc;

use async_trait::async_trait;
use github_models::PullRequest;

use crate::database::Databases;
use crate::deploy::auto::AutoDeploySource;
use crate::errors::PanelError;
use crate::http::dockerhub::DockerHubClient;
use crate::http::github::GithubClientExt;
use crate::models::user::User;

pub struct LiveSource {
    github: Arc<dyn GithubClientExt>,
    databases: Arc<Databases>,
    dockerhub: Arc<DockerHubClient>,
}

impl LiveSource {
    pub fn new(
        github: Arc<dyn GithubClientExt>,
        databases: Arc<Databases>,
        dockerhub: Arc<DockerHubClient>,
    ) -> Self {
        Self {
            github,
            databases,
            dockerhub,
        }
    }
}

#[async_trait]
impl AutoDeploySource for LiveSource {
    async fn eligible_pull_requests(&self, user: &User) -> Result<Vec<PullRequest>, PanelError> {
        self.github.get_pull_requests(user).await
    }

    async fn first_database(&self) -> Result<Option<String>, PanelError> {
        self.databases.first_database().await
    }

    async fn first_schema_version(&self) -> Result<Option<String>, PanelError> {
        let tags = self
            .dockerhub
            .fetch_tags_for_image(self.dockerhub.schema_image())
            .await?;
        Ok(tags.into_keys().next())
    }
}
