//! Reconciler worker tests

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tempfile::TempDir;

use testpanel::deploy::auto::AutoDeployOptions;
use testpanel::deploy::compose::ComposeEnvironment;
use testpanel::deploy::store::StateStore;
use testpanel::errors::PanelError;
use testpanel::storage::layout::StorageLayout;
use testpanel::workers::reconciler::{reconcile_once, run, Options};

use crate::support::{FakeGithub, FakeSource};

fn store(dir: &TempDir) -> (StorageLayout, StateStore) {
    let layout = StorageLayout::new(
        dir.path().join("config"),
        dir.path().join("state"),
        dir.path().join("nginx"),
    );
    let store = StateStore::new(
        &layout,
        Arc::new(FakeSource::new(&["issue-7"])),
        AutoDeployOptions::default(),
        ComposeEnvironment::default(),
    );
    (layout, store)
}

fn options() -> Options {
    Options {
        interval: Duration::from_secs(3600),
        initial_delay: Duration::from_secs(3600),
        host: "test.example.org".to_string(),
    }
}

#[tokio::test]
async fn test_reconcile_once_deploys_pull_requests() {
    let dir = TempDir::new().unwrap();
    let (layout, store) = store(&dir);
    let token = SecretString::from("good".to_string());

    let count = reconcile_once(&options(), &FakeGithub, &store, &token)
        .await
        .unwrap();

    assert_eq!(count, 1);
    let nginx = std::fs::read_to_string(layout.nginx_config_file().path()).unwrap();
    assert!(nginx.contains("server_name fallbackdb-issue-7.test.example.org;"));
}

#[tokio::test]
async fn test_reconcile_once_with_rejected_token() {
    let dir = TempDir::new().unwrap();
    let (layout, store) = store(&dir);
    let token = SecretString::from("revoked".to_string());

    let result = reconcile_once(&options(), &FakeGithub, &store, &token).await;

    assert!(matches!(result, Err(PanelError::AuthError(_))));
    assert!(!layout.configuration_file().path().exists());
}

#[tokio::test]
async fn test_run_stops_on_shutdown_before_first_reconcile() {
    let dir = TempDir::new().unwrap();
    let (layout, store) = store(&dir);
    let token = SecretString::from("good".to_string());

    tokio::time::timeout(
        Duration::from_secs(5),
        run(
            &options(),
            &FakeGithub,
            &store,
            &token,
            tokio::time::sleep,
            Box::pin(async {}),
        ),
    )
    .await
    .unwrap();

    assert!(!layout.configuration_file().path().exists());
}

#[tokio::test]
async fn test_run_reconciles_after_initial_delay() {
    let dir = TempDir::new().unwrap();
    let (layout, store) = store(&dir);
    let token = SecretString::from("good".to_string());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let options = Options {
        initial_delay: Duration::ZERO,
        ..options()
    };
    let worker = run(
        &options,
        &FakeGithub,
        &store,
        &token,
        tokio::time::sleep,
        Box::pin(async move {
            let _ = shutdown_rx.await;
        }),
    );
    let stopper = async {
        let configuration = layout.configuration_file();
        while !configuration.exists().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let _ = shutdown_tx.send(());
    };

    tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(worker, stopper) })
        .await
        .unwrap();

    let state = store.get_state().await.unwrap();
    assert_eq!(state.len(), 1);
    assert_eq!(state[0].branch, "issue-7");
}
