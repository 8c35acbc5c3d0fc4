//! Deployment state store tests

use std::sync::Arc;

use tempfile::TempDir;
use tokio_test::assert_ok;

use testpanel::deploy::auto::AutoDeployOptions;
use testpanel::deploy::compose::ComposeEnvironment;
use testpanel::deploy::store::StateStore;
use testpanel::errors::PanelError;
use testpanel::storage::layout::StorageLayout;
use testpanel::utils::sha256_hash;

use crate::support::{deployment, user, FakeSource};

const HOST: &str = "test.example.org";

fn layout(dir: &TempDir) -> StorageLayout {
    StorageLayout::new(
        dir.path().join("config"),
        dir.path().join("state"),
        dir.path().join("nginx"),
    )
}

fn store(layout: &StorageLayout, source: FakeSource) -> StateStore {
    StateStore::new(
        layout,
        Arc::new(source),
        AutoDeployOptions::default(),
        ComposeEnvironment::default(),
    )
}

#[tokio::test]
async fn test_get_state_creates_empty_file() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    let store = store(&layout, FakeSource::new(&[]));

    let state = assert_ok!(store.get_state().await);

    assert!(state.is_empty());
    let contents = std::fs::read_to_string(layout.configuration_file().path()).unwrap();
    assert_eq!(contents, "[]");
}

#[tokio::test]
async fn test_get_state_treats_blank_file_as_empty() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    std::fs::create_dir_all(&layout.state_dir).unwrap();
    std::fs::write(layout.configuration_file().path(), "\n").unwrap();
    let store = store(&layout, FakeSource::new(&[]));

    assert!(store.get_state().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_state_writes_generated_files() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    let store = store(&layout, FakeSource::new(&[]));

    let state = store
        .set_state(vec![deployment("main", "sp7demo", "6.8.03")], &user(), HOST, false)
        .await
        .unwrap();

    assert_eq!(state.len(), 1);
    assert_eq!(state[0].hostname, "sp7demo-main");

    let stored = store.get_state().await.unwrap();
    assert_eq!(stored[0].hostname.as_deref(), Some("sp7demo-main"));
    assert_eq!(stored[0].deployed_at, Some(state[0].deployed_at));

    let nginx = std::fs::read_to_string(layout.nginx_config_file().path()).unwrap();
    assert!(nginx.contains("server_name sp7demo-main.test.example.org;"));

    let compose = std::fs::read_to_string(layout.docker_compose_file().path()).unwrap();
    assert!(compose.contains("  sp7demo-main:\n"));
    assert!(compose.contains(&format!("CONFIG_HASH={}", sha256_hash(nginx.as_bytes()))));
}

#[tokio::test]
async fn test_set_state_keeps_deployed_at_of_unchanged_entries() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    let store = store(&layout, FakeSource::new(&[]));

    let first = store
        .set_state(vec![deployment("main", "db", "6.8.03")], &user(), HOST, false)
        .await
        .unwrap();

    let mut resubmitted: Vec<_> = store.get_state().await.unwrap();
    resubmitted[0].deployed_at = Some(1);
    let second = store.set_state(resubmitted, &user(), HOST, false).await.unwrap();
    assert_eq!(second[0].deployed_at, 1);

    let mut changed = store.get_state().await.unwrap();
    changed[0].database = "other".to_string();
    let third = store.set_state(changed, &user(), HOST, false).await.unwrap();
    assert!(third[0].deployed_at >= first[0].deployed_at);
    assert_eq!(third[0].hostname, "other-main");
}

#[tokio::test]
async fn test_set_state_with_auto_deploy_adds_pull_requests() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    let store = store(&layout, FakeSource::new(&["issue-7"]));

    let state = store
        .set_state(vec![deployment("main", "db", "6.8.03")], &user(), HOST, true)
        .await
        .unwrap();

    let branches: Vec<&str> = state.iter().map(|d| d.branch.as_str()).collect();
    assert_eq!(branches, vec!["main", "issue-7"]);
    assert!(state[1].was_auto_deployed);
    assert_eq!(state[1].database, "db");
}

#[tokio::test]
async fn test_ping_rejects_unknown_index() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    let store = store(&layout, FakeSource::new(&[]));

    let result = store.ping(3, &user(), HOST).await;

    match result {
        Err(PanelError::ValidationError(message)) => assert_eq!(message, "Invalid index"),
        other => panic!("unexpected result: {:?}", other.map(|state| state.len())),
    }
}

#[tokio::test]
async fn test_ping_updates_accessed_at() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    let store = store(&layout, FakeSource::new(&[]));

    let mut old = deployment("main", "db", "6.8.03");
    old.accessed_at = Some(1);
    old.deployed_at = Some(1);
    store.set_state(vec![old], &user(), HOST, false).await.unwrap();

    let state = store.ping(0, &user(), HOST).await.unwrap();

    assert!(state[0].accessed_at > 1);
    assert_eq!(state[0].deployed_at, 1);
}

#[tokio::test]
async fn test_reconcile_runs_auto_deploy_on_stored_state() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    let source = FakeSource::new(&["issue-7"]);
    let store = store(&layout, source);

    let state = store.reconcile(&user(), HOST).await.unwrap();

    assert_eq!(state.len(), 1);
    assert_eq!(state[0].database, "fallback_db");
    assert_eq!(store.get_state().await.unwrap().len(), 1);
}
