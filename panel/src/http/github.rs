//! GitHub GraphQL and OAuth client

use std::collections::BTreeMap;

use async_trait::async_trait;
use github_models::{
    AccessTokenResponse, GraphqlResponse, OrganizationData, PullRequest, RepositoryData,
};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::deploy::eligibility::filter_pull_requests;
use crate::errors::PanelError;
use crate::http::client::HttpClient;
use crate::models::user::User;
use crate::storage::settings::GithubSettings;

/// GitHub operations, behind a trait for testability
#[async_trait]
pub trait GithubClientExt: Send + Sync {
    /// Resolve a token to a user with their organization's teams
    async fn get_user_info(&self, token: &SecretString) -> Result<User, PanelError>;

    /// Open pull requests that are ready for testing
    async fn get_pull_requests(&self, user: &User) -> Result<Vec<PullRequest>, PanelError>;

    /// Exchange an OAuth `code` for an access token
    async fn exchange_code(&self, code: &str) -> Result<String, PanelError>;
}

/// GitHub client implementation
pub struct GithubClient {
    http_client: HttpClient,
    settings: GithubSettings,
}

impl GithubClient {
    pub fn new(http_client: HttpClient, settings: GithubSettings) -> Self {
        Self {
            http_client,
            settings,
        }
    }

    /// Run a GraphQL query and unwrap its `data`
    pub async fn query<T: DeserializeOwned>(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<T, PanelError> {
        let body = serde_json::json!({ "query": query });
        let response: GraphqlResponse<T> = self
            .http_client
            .post(
                &self.settings.graphql_url,
                Some(token.expose_secret()),
                &body,
            )
            .await?;

        match response.data {
            Some(data) => Ok(data),
            None => {
                let messages: Vec<String> =
                    response.errors.into_iter().map(|e| e.message).collect();
                Err(PanelError::GithubError(if messages.is_empty() {
                    "Empty GraphQL response".to_string()
                } else {
                    messages.join("; ")
                }))
            }
        }
    }

    fn organization_query(&self) -> String {
        format!(
            r#"{{
  organization(login: "{organization}") {{
    teams(first: 40) {{
      nodes {{
        name
        members(first: 40) {{
          nodes {{
            login
          }}
        }}
      }}
    }}
  }}
  viewer {{
    name
    login
  }}
}}"#,
            organization = self.settings.organization
        )
    }

    fn pull_requests_query(&self) -> String {
        format!(
            r#"{{
  repository(name: "{repository}", owner: "{organization}") {{
    pullRequests(
      orderBy: {{ field: UPDATED_AT, direction: DESC }},
      states: OPEN,
      first: 100
    ) {{
      nodes {{
        title
        commits(last: 1) {{
          nodes {{
            commit {{
              statusCheckRollup {{
                state
              }}
            }}
          }}
        }}
        number
        mergeable
        merged
        isDraft
        reviews(first: 100, states: [APPROVED, CHANGES_REQUESTED]) {{
          nodes {{
            state
            publishedAt
            author {{
              ... on User {{
                username: login
              }}
            }}
          }}
        }}
        reviewRequests(first: 10) {{
          nodes {{
            requestedReviewer {{
              ... on User {{
                username: login
              }}
              ... on Team {{
                teamname: name
              }}
            }}
          }}
        }}
        closingIssuesReferences(first: 10) {{
          nodes {{
            number
            title
          }}
        }}
        headRefName
      }}
    }}
  }}
}}"#,
            repository = self.settings.repository,
            organization = self.settings.organization
        )
    }
}

#[async_trait]
impl GithubClientExt for GithubClient {
    async fn get_user_info(&self, token: &SecretString) -> Result<User, PanelError> {
        let data: OrganizationData = self.query(token, &self.organization_query()).await?;

        let teams: BTreeMap<String, Vec<String>> = data
            .organization
            .map(|organization| organization.teams.nodes)
            .unwrap_or_default()
            .into_iter()
            .map(|team| {
                let members = team.members.nodes.into_iter().map(|m| m.login).collect();
                (team.name, members)
            })
            .collect();

        if teams.is_empty() {
            return Err(PanelError::AuthError(
                "Sorry, you are not authorized to access this page".to_string(),
            ));
        }

        debug!("Resolved GitHub user {}", data.viewer.login);
        Ok(User {
            token: token.clone(),
            name: data.viewer.name.unwrap_or_else(|| data.viewer.login.clone()),
            login: data.viewer.login,
            teams,
        })
    }

    async fn get_pull_requests(&self, user: &User) -> Result<Vec<PullRequest>, PanelError> {
        let data: RepositoryData = self.query(&user.token, &self.pull_requests_query()).await?;
        let open = data.repository.pull_requests.nodes;
        let total = open.len();

        let eligible = filter_pull_requests(open, user, &self.settings.target_teams);
        info!(
            "{} of {} open pull requests are ready for testing",
            eligible.len(),
            total
        );
        Ok(eligible)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, PanelError> {
        let client_id = self
            .settings
            .client_id
            .as_deref()
            .ok_or_else(|| PanelError::ConfigError("GitHub client id is not set".to_string()))?;
        let client_secret = self.settings.client_secret.as_ref().ok_or_else(|| {
            PanelError::ConfigError("GitHub client secret is not set".to_string())
        })?;

        let body = serde_json::json!({
            "client_id": client_id,
            "client_secret": client_secret.expose_secret(),
            "code": code,
        });
        let response: AccessTokenResponse = self
            .http_client
            .post(&self.settings.oauth_url, None, &body)
            .await?;

        match (response.access_token, response.error) {
            (_, Some(error)) => Err(PanelError::AuthError(
                response.error_description.unwrap_or(error),
            )),
            (Some(token), None) => Ok(token),
            (None, None) => Err(PanelError::AuthError("Bad request".to_string())),
        }
    }
}
