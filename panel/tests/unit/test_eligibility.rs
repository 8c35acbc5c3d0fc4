//! Pull request readiness unit tests

use github_models::PullRequest;
use serde_json::{json, Value};

use testpanel::deploy::eligibility::{filter_pull_requests, is_ready_for_testing};

use crate::support::{pull_request_json, target_teams, user};

fn review(username: &str, state: &str, published_at: &str) -> Value {
    json!({
        "state": state,
        "publishedAt": published_at,
        "author": { "username": username },
    })
}

fn team_request(team: &str) -> Value {
    json!({ "requestedReviewer": { "teamname": team } })
}

fn user_request(username: &str) -> Value {
    json!({ "requestedReviewer": { "username": username } })
}

fn build(reviews: Vec<Value>, requests: Vec<Value>) -> PullRequest {
    let mut pull_request = pull_request_json("issue-1");
    pull_request["reviews"] = json!({ "nodes": reviews });
    pull_request["reviewRequests"] = json!({ "nodes": requests });
    serde_json::from_value(pull_request).unwrap()
}

fn ready(pull_request: &PullRequest) -> bool {
    is_ready_for_testing(pull_request, &user(), &target_teams())
}

#[test]
fn test_ready_when_only_testing_team_is_pending() {
    let pull_request = build(
        vec![review("dev", "APPROVED", "2024-01-02T00:00:00Z")],
        vec![team_request("Testing")],
    );
    assert!(ready(&pull_request));
}

#[test]
fn test_ready_when_testing_member_is_pending() {
    let pull_request = build(Vec::new(), vec![user_request("uma")]);
    assert!(ready(&pull_request));
}

#[test]
fn test_not_ready_without_review_requests() {
    let pull_request = build(vec![review("dev", "APPROVED", "2024-01-02T00:00:00Z")], Vec::new());
    assert!(!ready(&pull_request));
}

#[test]
fn test_not_ready_when_draft_conflicting_or_failing() {
    let mut draft = pull_request_json("issue-1");
    draft["isDraft"] = json!(true);
    assert!(!ready(&serde_json::from_value(draft).unwrap()));

    let mut conflicting = pull_request_json("issue-1");
    conflicting["mergeable"] = json!("CONFLICTING");
    assert!(!ready(&serde_json::from_value(conflicting).unwrap()));

    let mut failing = pull_request_json("issue-1");
    failing["commits"]["nodes"][0]["commit"]["statusCheckRollup"]["state"] = json!("FAILURE");
    assert!(!ready(&serde_json::from_value(failing).unwrap()));

    let mut unchecked = pull_request_json("issue-1");
    unchecked["commits"] = json!({ "nodes": [] });
    assert!(!ready(&serde_json::from_value(unchecked).unwrap()));
}

#[test]
fn test_latest_review_of_each_author_counts() {
    let approved_later = build(
        vec![
            review("dev", "CHANGES_REQUESTED", "2024-01-01T00:00:00Z"),
            review("dev", "APPROVED", "2024-01-02T00:00:00Z"),
        ],
        vec![team_request("Testing")],
    );
    assert!(ready(&approved_later));

    let changes_requested_later = build(
        vec![
            review("dev", "APPROVED", "2024-01-01T00:00:00Z"),
            review("dev", "CHANGES_REQUESTED", "2024-01-02T00:00:00Z"),
        ],
        vec![team_request("Testing")],
    );
    assert!(!ready(&changes_requested_later));
}

#[test]
fn test_not_ready_when_other_reviewers_are_pending() {
    let pending_developer = build(
        Vec::new(),
        vec![team_request("Testing"), user_request("dev")],
    );
    assert!(!ready(&pending_developer));

    let pending_team = build(
        Vec::new(),
        vec![team_request("Testing"), team_request("Developers")],
    );
    assert!(!ready(&pending_team));
}

#[test]
fn test_not_ready_when_only_reviewer_outside_testing_approved() {
    let pull_request = build(
        vec![review("dev", "APPROVED", "2024-01-02T00:00:00Z")],
        vec![user_request("dev")],
    );
    assert!(!ready(&pull_request));
}

#[test]
fn test_team_request_resolved_by_member_approval() {
    let pull_request = build(
        vec![review("carol", "APPROVED", "2024-01-02T00:00:00Z")],
        vec![team_request("Testing")],
    );
    assert!(!ready(&pull_request));
}

#[test]
fn test_filter_keeps_order_of_ready_pull_requests() {
    let mut draft = pull_request_json("draft");
    draft["isDraft"] = json!(true);
    let pull_requests: Vec<PullRequest> = vec![
        serde_json::from_value(pull_request_json("first")).unwrap(),
        serde_json::from_value(draft).unwrap(),
        serde_json::from_value(pull_request_json("second")).unwrap(),
    ];

    let ready = filter_pull_requests(pull_requests, &user(), &target_teams());

    let branches: Vec<&str> = ready.iter().map(|pr| pr.head_ref_name.as_str()).collect();
    assert_eq!(branches, vec!["first", "second"]);
}
