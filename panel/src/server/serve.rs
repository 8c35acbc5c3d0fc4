//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::PanelError;
use crate::server::handlers::{
    clone_database_handler, database_sizes_handler, databases_handler, disk_usage_handler,
    dockerhub_handler, drop_database_handler, export_database_handler, get_state_handler,
    health_handler, login_handler, make_admin_handler, ping_handler, set_state_handler,
    upload_database_handler, user_handler, users_handler, version_handler, webhook_handler,
};
use crate::server::state::ServerState;

/// Largest accepted database upload (4 GiB)
pub const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024 * 1024;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    let upload_limit = usize::try_from(MAX_UPLOAD_BYTES).unwrap_or(usize::MAX);

    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Deployments
        .route("/api/state", get(get_state_handler).post(set_state_handler))
        .route("/api/state/{index}/ping", post(ping_handler))
        .route("/api/webhook", post(webhook_handler))
        // Databases
        .route("/api/databases", get(databases_handler))
        .route("/api/databases/size", get(database_sizes_handler))
        .route(
            "/api/databases/upload",
            post(upload_database_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/databases/{name}/export", get(export_database_handler))
        .route("/api/databases/{name}/drop", get(drop_database_handler))
        .route("/api/databases/{name}/clone", get(clone_database_handler))
        .route("/api/databases/{name}/users", get(users_handler))
        .route(
            "/api/databases/{name}/user/{id}/make-admin",
            any(make_admin_handler),
        )
        // Images
        .route("/api/dockerhub/{image}", get(dockerhub_handler))
        // Account
        .route("/api/login", get(login_handler))
        .route("/api/user", get(user_handler))
        .route("/api/disk-usage", get(disk_usage_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), PanelError>>, PanelError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| PanelError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| PanelError::ServerError(e.to_string()))
    });

    Ok(handle)
}
