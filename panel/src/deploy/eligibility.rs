//! Pull request readiness for testing
//!
//! A pull request is ready when it is mergeable and green, every reviewer's
//! latest review is an approval, and the only reviews still outstanding are
//! owed by the target teams or their members.

use std::collections::HashMap;

use github_models::{
    Mergeable, PullRequest, RequestedReviewer, Review, ReviewState, StatusState,
};

use crate::models::user::User;

/// Keep only the pull requests that are ready for testing
pub fn filter_pull_requests(
    pull_requests: Vec<PullRequest>,
    user: &User,
    target_teams: &[String],
) -> Vec<PullRequest> {
    pull_requests
        .into_iter()
        .filter(|pull_request| is_ready_for_testing(pull_request, user, target_teams))
        .collect()
}

/// Most recent review of every author, keyed by login
fn most_recent_reviews(reviews: &[Review]) -> HashMap<&str, &Review> {
    let mut latest: HashMap<&str, &Review> = HashMap::new();
    for review in reviews {
        let username = review.username();
        match latest.get(username) {
            Some(current) if current.published_at >= review.published_at => {}
            _ => {
                latest.insert(username, review);
            }
        }
    }
    latest
}

pub fn is_ready_for_testing(
    pull_request: &PullRequest,
    user: &User,
    target_teams: &[String],
) -> bool {
    if pull_request.mergeable != Mergeable::Mergeable
        || pull_request.merged
        || pull_request.is_draft
        || pull_request.review_requests.nodes.is_empty()
        || pull_request.status_check_state() != Some(StatusState::Success)
    {
        return false;
    }

    let reviews = most_recent_reviews(&pull_request.reviews.nodes);
    if reviews
        .values()
        .any(|review| review.state != ReviewState::Approved)
    {
        return false;
    }
    let approved: Vec<&str> = reviews.keys().copied().collect();

    let mut pending_users: Vec<&str> = Vec::new();
    let mut requested_teams: Vec<&str> = Vec::new();
    for request in &pull_request.review_requests.nodes {
        match &request.requested_reviewer {
            Some(RequestedReviewer::User { username }) => {
                if !approved.contains(&username.as_str()) {
                    pending_users.push(username);
                }
            }
            Some(RequestedReviewer::Team { teamname }) if !teamname.is_empty() => {
                requested_teams.push(teamname);
            }
            _ => {}
        }
    }

    let pending_non_target_members: Vec<&str> = pending_users
        .iter()
        .copied()
        .filter(|username| {
            !target_teams
                .iter()
                .any(|team| user.is_team_member(team, username))
        })
        .collect();
    let member_assigned = pending_users.len() > pending_non_target_members.len();

    // A team request counts as resolved once any of its members approved
    let pending_teams: Vec<&str> = requested_teams
        .into_iter()
        .filter(|team| {
            !approved
                .iter()
                .any(|username| user.is_team_member(team, username))
        })
        .collect();
    let pending_non_target_teams: Vec<&str> = pending_teams
        .iter()
        .copied()
        .filter(|team| !target_teams.iter().any(|target| target == team))
        .collect();
    let team_assigned = pending_teams.len() > pending_non_target_teams.len();

    (team_assigned || member_assigned)
        && pending_non_target_members.is_empty()
        && pending_non_target_teams.is_empty()
}
