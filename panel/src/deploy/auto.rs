//! Auto-deployment of pull requests that are ready for testing

use std::time::Duration;

use async_trait::async_trait;
use github_models::PullRequest;
use tracing::{error, info};

use crate::deploy::formalize::formalize_state;
use crate::deploy::names::most_common;
use crate::errors::PanelError;
use crate::models::deployment::{ActiveDeployment, Deployment};
use crate::models::user::User;
use crate::storage::settings::DeploymentSettings;

/// External inputs of the auto-deployment, behind a trait for testability
#[async_trait]
pub trait AutoDeploySource: Send + Sync {
    /// Pull requests that are ready for testing
    async fn eligible_pull_requests(&self, user: &User) -> Result<Vec<PullRequest>, PanelError>;

    /// First database that has a schema version
    async fn first_database(&self) -> Result<Option<String>, PanelError>;

    /// First available schema version
    async fn first_schema_version(&self) -> Result<Option<String>, PanelError>;
}

/// Auto-deployment limits
#[derive(Debug, Clone)]
pub struct AutoDeployOptions {
    pub max_auto_deployments: usize,

    /// Auto-deployed instances not accessed for this long are removed
    pub stale_after: Duration,

    /// Manually added instances not accessed for this long are removed
    pub custom_stale_after: Duration,
}

impl Default for AutoDeployOptions {
    fn default() -> Self {
        Self::from(&DeploymentSettings::default())
    }
}

impl From<&DeploymentSettings> for AutoDeployOptions {
    fn from(settings: &DeploymentSettings) -> Self {
        Self {
            max_auto_deployments: settings.max_auto_deployments,
            stale_after: Duration::from_secs(settings.stale_after_secs),
            custom_stale_after: Duration::from_secs(settings.custom_stale_after_secs),
        }
    }
}

fn is_stale(deployment: &ActiveDeployment, options: &AutoDeployOptions, now: i64) -> bool {
    let limit = if deployment.was_auto_deployed {
        options.stale_after
    } else {
        options.custom_stale_after
    };
    let limit_millis = i64::try_from(limit.as_millis()).unwrap_or(i64::MAX);
    now.saturating_sub(deployment.accessed_at) > limit_millis
}

/// Whether a deployment survives garbage collection. An auto-deployment
/// whose pull request is no longer ready goes even if it was used recently.
fn should_keep(
    deployment: &ActiveDeployment,
    pull_requests: &[PullRequest],
    options: &AutoDeployOptions,
    now: i64,
) -> bool {
    let ready_for_testing = pull_requests
        .iter()
        .any(|pull_request| pull_request.head_ref_name == deployment.branch);
    deployment.is_frozen()
        || (!is_stale(deployment, options, now)
            && (!deployment.was_auto_deployed || ready_for_testing))
}

/// Remove stale and obsolete deployments, then add one auto-deployed
/// instance per eligible pull request that is not deployed yet.
pub async fn auto_deploy_pull_requests(
    state: Vec<ActiveDeployment>,
    user: &User,
    auto_deploy: bool,
    source: &dyn AutoDeploySource,
    options: &AutoDeployOptions,
    now: i64,
) -> Result<Vec<ActiveDeployment>, PanelError> {
    if !auto_deploy {
        let state: Vec<Deployment> = state.into_iter().map(Deployment::from).collect();
        return Ok(formalize_state(
            state,
            None,
            options.max_auto_deployments,
            now,
        ));
    }

    let pull_requests = source.eligible_pull_requests(user).await?;

    let databases: Vec<&str> = state.iter().map(|d| d.database.as_str()).collect();
    let schema_versions: Vec<&str> = state.iter().map(|d| d.schema_version.as_str()).collect();
    let common_database = most_common(&databases).map(str::to_string);
    let common_schema_version = most_common(&schema_versions).map(str::to_string);

    let trimmed: Vec<Deployment> = state
        .iter()
        .filter(|deployment| should_keep(deployment, &pull_requests, options, now))
        .cloned()
        .map(Deployment::from)
        .collect();
    let removed = state.len() - trimmed.len();
    if removed > 0 {
        info!("Removing {} stale or obsolete deployments", removed);
    }

    let new_branches: Vec<String> = pull_requests
        .into_iter()
        .map(|pull_request| pull_request.head_ref_name)
        .filter(|branch| trimmed.iter().all(|deployment| &deployment.branch != branch))
        .collect();

    let mut deployments = trimmed;
    if !new_branches.is_empty() {
        let database = match common_database {
            Some(database) => Some(database),
            None => source.first_database().await?,
        };
        let schema_version = match common_schema_version {
            Some(version) => Some(version),
            None => source.first_schema_version().await?,
        };

        match (database, schema_version) {
            (Some(database), Some(schema_version)) => {
                info!("Auto-deploying {} pull requests", new_branches.len());
                deployments.extend(new_branches.into_iter().map(|branch| {
                    Deployment::auto_deployed(branch, database.clone(), schema_version.clone())
                }));
            }
            (None, _) => error!("No databases found for auto deployment"),
            (_, None) => error!("No schema versions found for auto deployment"),
        }
    }

    Ok(formalize_state(
        deployments,
        None,
        options.max_auto_deployments,
        now,
    ))
}
