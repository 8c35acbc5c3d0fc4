//! Periodic reconciliation worker
//!
//! Re-runs the auto-deployment on a timer so that pull requests are deployed
//! and stale instances removed even when no webhook arrives.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, error, info};

use crate::deploy::store::StateStore;
use crate::errors::PanelError;
use crate::http::github::GithubClientExt;

/// Reconciler worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Time between reconciliations
    pub interval: Duration,

    /// Initial delay before the first reconciliation
    pub initial_delay: Duration,

    /// Instance domain for the generated nginx config
    pub host: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            initial_delay: Duration::from_secs(30),
            host: "test.specifysystems.org".to_string(),
        }
    }
}

/// Reconcile once with the service account
pub async fn reconcile_once(
    options: &Options,
    github: &dyn GithubClientExt,
    store: &StateStore,
    token: &SecretString,
) -> Result<usize, PanelError> {
    let user = github.get_user_info(token).await?;
    let state = store.reconcile(&user, &options.host).await?;
    Ok(state.len())
}

/// Run the reconciler worker
pub async fn run<S, F>(
    options: &Options,
    github: &dyn GithubClientExt,
    store: &StateStore,
    token: &SecretString,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Reconciler worker starting...");

    tokio::select! {
        _ = &mut shutdown_signal => {
            info!("Reconciler worker shutting down...");
            return;
        }
        _ = sleep_fn(options.initial_delay) => {}
    }

    loop {
        debug!("Reconciling deployments...");
        match reconcile_once(options, github, store, token).await {
            Ok(count) => debug!("Reconciled {} deployments", count),
            Err(e) => error!("Reconciliation failed: {}", e),
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Reconciler worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }
}
