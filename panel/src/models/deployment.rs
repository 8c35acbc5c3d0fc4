//! Deployment models

use serde::{Deserialize, Serialize};

/// A test instance configuration, as stored in `configuration.json` and as
/// posted by the dashboard. Derived fields are absent until formalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Branch of the application to run
    pub branch: String,

    /// Database the instance connects to
    pub database: String,

    /// Schema (Specify 6) version mounted into the instance
    pub schema_version: String,

    /// Created from an eligible pull request rather than by a user
    #[serde(default)]
    pub was_auto_deployed: bool,

    /// Free-form notes. Non-empty notes exempt the instance from cleanup.
    #[serde(default)]
    pub notes: String,

    /// Optional dashboard grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Image digest to pin instead of the branch tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Unix epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<i64>,

    /// Unix epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<i64>,
}

impl Deployment {
    /// A new auto-deployed entry for a pull request branch
    pub fn auto_deployed(branch: String, database: String, schema_version: String) -> Self {
        Self {
            branch,
            database,
            schema_version,
            was_auto_deployed: true,
            notes: String::new(),
            group: None,
            digest: None,
            hostname: None,
            deployed_at: None,
            accessed_at: None,
        }
    }

    /// Whether `branch`, `database` and `schema_version` all match `other`
    pub fn same_target(&self, other: &Deployment) -> bool {
        self.branch == other.branch
            && self.database == other.database
            && self.schema_version == other.schema_version
    }
}

/// A formalized deployment: hostname and timestamps are always present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDeployment {
    pub branch: String,
    pub database: String,
    pub schema_version: String,
    pub was_auto_deployed: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub hostname: String,
    pub deployed_at: i64,
    pub accessed_at: i64,
}

impl ActiveDeployment {
    /// Frozen deployments are never garbage collected
    pub fn is_frozen(&self) -> bool {
        !self.notes.is_empty()
    }
}

impl From<ActiveDeployment> for Deployment {
    fn from(deployment: ActiveDeployment) -> Self {
        Self {
            branch: deployment.branch,
            database: deployment.database,
            schema_version: deployment.schema_version,
            was_auto_deployed: deployment.was_auto_deployed,
            notes: deployment.notes,
            group: deployment.group,
            digest: deployment.digest,
            hostname: Some(deployment.hostname),
            deployed_at: Some(deployment.deployed_at),
            accessed_at: Some(deployment.accessed_at),
        }
    }
}
