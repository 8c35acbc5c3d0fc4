//! API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GraphQL response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// A single GraphQL error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

/// GraphQL connection (only the `nodes` shape is queried)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection<T> {
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

// ============================== PULL REQUESTS ============================== //

/// `repository { pullRequests }` query result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryData {
    pub repository: Repository,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub pull_requests: Connection<PullRequest>,
}

/// An open pull request with the fields needed to decide test readiness
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub title: String,
    pub number: u64,
    pub mergeable: Mergeable,
    pub merged: bool,
    pub is_draft: bool,
    #[serde(default)]
    pub commits: Connection<CommitNode>,
    #[serde(default)]
    pub reviews: Connection<Review>,
    #[serde(default)]
    pub review_requests: Connection<ReviewRequest>,
    #[serde(default)]
    pub closing_issues_references: Connection<IssueReference>,
    pub head_ref_name: String,
}

impl PullRequest {
    /// Status check rollup of the latest commit, if any
    pub fn status_check_state(&self) -> Option<StatusState> {
        self.commits
            .nodes
            .first()
            .and_then(|node| node.commit.status_check_rollup.as_ref())
            .map(|rollup| rollup.state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mergeable {
    Conflicting,
    Mergeable,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitNode {
    pub commit: Commit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    #[serde(default)]
    pub status_check_rollup: Option<StatusCheckRollup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCheckRollup {
    pub state: StatusState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusState {
    Error,
    Expected,
    Failure,
    Pending,
    Success,
}

/// A submitted review
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub state: ReviewState,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<ReviewAuthor>,
}

impl Review {
    /// Login of the review author. Bots and deleted accounts have none.
    pub fn username(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|author| author.username.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAuthor {
    #[serde(default)]
    pub username: Option<String>,
}

/// A pending review request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub requested_reviewer: Option<RequestedReviewer>,
}

/// Who a review was requested from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestedReviewer {
    User { username: String },
    Team { teamname: String },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueReference {
    pub number: u64,
    pub title: String,
}

// ============================== ORGANIZATION =============================== //

/// `organization { teams } viewer` query result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationData {
    #[serde(default)]
    pub organization: Option<Organization>,
    pub viewer: Viewer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub teams: Connection<Team>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub members: Connection<TeamMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewer {
    #[serde(default)]
    pub name: Option<String>,
    pub login: String,
}

// ================================= OAUTH =================================== //

/// Response of `login/oauth/access_token` with `Accept: application/json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

// ================================ DOCKERHUB ================================ //

/// One page of the DockerHub tags listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagPage {
    pub results: Vec<Tag>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub last_updated: Option<String>,
}
