//! Auto-deployment unit tests

use std::sync::atomic::Ordering;
use std::time::Duration;

use testpanel::deploy::auto::{auto_deploy_pull_requests, AutoDeployOptions};

use crate::support::{active, user, FakeSource, HOUR_MS};

const NOW: i64 = 1_700_000_000_000;

fn options() -> AutoDeployOptions {
    AutoDeployOptions {
        max_auto_deployments: 6,
        stale_after: Duration::from_secs(48 * 60 * 60),
        custom_stale_after: Duration::from_secs(96 * 60 * 60),
    }
}

#[tokio::test]
async fn test_disabled_auto_deploy_skips_source() {
    let source = FakeSource::new(&["new-feature"]);
    let mut stale = active("old", "db", "db-old", NOW - 1000 * HOUR_MS);
    stale.was_auto_deployed = true;

    let state = auto_deploy_pull_requests(vec![stale], &user(), false, &source, &options(), NOW)
        .await
        .unwrap();

    assert_eq!(state.len(), 1);
    assert_eq!(state[0].branch, "old");
    assert_eq!(source.pull_request_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_adds_new_pull_requests_with_common_defaults() {
    let source = FakeSource::new(&["main", "issue-7"]);
    let state = vec![
        active("main", "sp7demo", "sp7demo-main", NOW),
        active("develop", "sp7demo", "sp7demo-develop", NOW),
        active("develop", "other", "other-develop", NOW),
    ];

    let state = auto_deploy_pull_requests(state, &user(), true, &source, &options(), NOW)
        .await
        .unwrap();

    assert_eq!(state.len(), 4);
    let added = &state[3];
    assert_eq!(added.branch, "issue-7");
    assert_eq!(added.database, "sp7demo");
    assert_eq!(added.schema_version, "6.8.03");
    assert!(added.was_auto_deployed);
    assert_eq!(added.hostname, "sp7demo-issue-7");
    assert_eq!(added.deployed_at, NOW);
    assert_eq!(source.default_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_removes_stale_and_obsolete_deployments() {
    let source = FakeSource::new(&["still-open"]);

    let mut obsolete = active("merged", "db", "db-merged", NOW);
    obsolete.was_auto_deployed = true;
    let mut still_open = active("still-open", "db", "db-still-open", NOW);
    still_open.was_auto_deployed = true;
    let mut stale_auto = active("still-open", "db", "db-still-open-1", NOW - 49 * HOUR_MS);
    stale_auto.was_auto_deployed = true;
    let recent_manual = active("manual", "db", "db-manual", NOW - 49 * HOUR_MS);
    let stale_manual = active("abandoned", "db", "db-abandoned", NOW - 97 * HOUR_MS);

    let state = auto_deploy_pull_requests(
        vec![obsolete, still_open, stale_auto, recent_manual, stale_manual],
        &user(),
        true,
        &source,
        &options(),
        NOW,
    )
    .await
    .unwrap();

    let branches: Vec<&str> = state.iter().map(|d| d.branch.as_str()).collect();
    assert_eq!(branches, vec!["manual", "still-open"]);
}

#[tokio::test]
async fn test_fresh_auto_deployment_of_closed_pull_request_is_removed() {
    let source = FakeSource::new(&[]);
    let mut closed = active("closed", "db", "db-closed", NOW);
    closed.was_auto_deployed = true;
    let manual = active("closed", "db", "db-closed-1", NOW);

    let state = auto_deploy_pull_requests(
        vec![closed, manual],
        &user(),
        true,
        &source,
        &options(),
        NOW,
    )
    .await
    .unwrap();

    assert_eq!(state.len(), 1);
    assert!(!state[0].was_auto_deployed);
}

#[tokio::test]
async fn test_frozen_deployments_are_kept() {
    let source = FakeSource::new(&[]);
    let mut frozen = active("merged", "db", "db-merged", NOW - 1000 * HOUR_MS);
    frozen.was_auto_deployed = true;
    frozen.notes = "demo for the workshop".to_string();

    let state = auto_deploy_pull_requests(vec![frozen], &user(), true, &source, &options(), NOW)
        .await
        .unwrap();

    assert_eq!(state.len(), 1);
    assert_eq!(state[0].notes, "demo for the workshop");
}

#[tokio::test]
async fn test_empty_state_uses_source_defaults() {
    let source = FakeSource::new(&["issue-7"]);

    let state = auto_deploy_pull_requests(Vec::new(), &user(), true, &source, &options(), NOW)
        .await
        .unwrap();

    assert_eq!(state.len(), 1);
    assert_eq!(state[0].database, "fallback_db");
    assert_eq!(state[0].schema_version, "6.8.01");
    assert_eq!(state[0].hostname, "fallbackdb-issue-7");
}

#[tokio::test]
async fn test_missing_database_skips_new_deployments() {
    let source = FakeSource::new(&["issue-7"]).without_defaults();

    let state = auto_deploy_pull_requests(Vec::new(), &user(), true, &source, &options(), NOW)
        .await
        .unwrap();

    assert!(state.is_empty());
}

#[tokio::test]
async fn test_no_new_pull_requests_skips_default_lookup() {
    let source = FakeSource::new(&[]);

    let state = auto_deploy_pull_requests(Vec::new(), &user(), true, &source, &options(), NOW)
        .await
        .unwrap();

    assert!(state.is_empty());
    assert_eq!(source.pull_request_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.default_calls.load(Ordering::SeqCst), 0);
}
