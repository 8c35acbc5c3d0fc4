//! HTTP request handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path, Query, State},
    http::{
        header::{
            HeaderName, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, EXPIRES, LOCATION,
            ORIGIN, PRAGMA,
        },
        HeaderMap, Method, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use panel_api::{DataResponse, HealthResponse, LoginResponse, MessageResponse, VersionResponse};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use url::Url;

use crate::authn::session::AuthUser;
use crate::errors::PanelError;
use crate::filesys::dir::Dir;
use crate::models::deployment::Deployment;
use crate::server::state::ServerState;
use crate::telemetry::disk_usage;
use crate::utils::version_info;

/// Headers that keep browsers and proxies from caching a response
const NO_CACHE: [(HeaderName, &str); 3] = [
    (
        CACHE_CONTROL,
        "no-store, no-cache, must-revalidate, proxy-revalidate",
    ),
    (PRAGMA, "no-cache"),
    (EXPIRES, "0"),
];

/// Where the dashboard lists databases
const DATABASES_PAGE: &str = "/databases/";

fn redirect_to_databases() -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, DATABASES_PAGE)])
}

/// `host[:port]` of an origin URL
pub fn parse_host(origin: &str) -> Result<String, PanelError> {
    let url = Url::parse(origin)
        .map_err(|e| PanelError::ValidationError(format!("Invalid origin {}: {}", origin, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| PanelError::ValidationError(format!("Origin {} has no host", origin)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn origin_host(headers: &HeaderMap) -> Result<String, PanelError> {
    let origin = headers
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            PanelError::ValidationError("\"Origin\" request header is missing".to_string())
        })?;
    parse_host(origin)
}

// ================================= SERVICE ================================== //

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "test-panel".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

// ================================== STATE =================================== //

pub async fn get_state_handler(
    AuthUser(_user): AuthUser,
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, PanelError> {
    let deployments = state.store.get_state().await?;
    Ok((NO_CACHE, Json(DataResponse::new(deployments))))
}

pub async fn set_state_handler(
    AuthUser(user): AuthUser,
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PanelError> {
    let deployments: Vec<Deployment> = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected state update: {}", e);
        PanelError::ValidationError("Invalid request body specified".to_string())
    })?;
    let host = origin_host(&headers)?;

    info!("{} submitted {} deployments", user.login, deployments.len());
    let new_state = state.store.set_state(deployments, &user, &host, true).await?;
    Ok((NO_CACHE, Json(DataResponse::new(new_state))))
}

/// Keeps a deployment from being garbage collected
pub async fn ping_handler(
    AuthUser(user): AuthUser,
    State(state): State<Arc<ServerState>>,
    Path(index): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, PanelError> {
    let host = origin_host(&headers)?;
    let index: usize = index
        .parse()
        .map_err(|_| PanelError::ValidationError("Invalid index".to_string()))?;

    state.store.ping(index, &user, &host).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reconcile with the service account, e.g. after a pull request changed
pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, PanelError> {
    let reconcile = async {
        let token = state.personal_token.as_ref().ok_or_else(|| {
            PanelError::ConfigError("GitHub personal token is not set".to_string())
        })?;
        let user = state.github.get_user_info(token).await?;
        let host = origin_host(&headers).unwrap_or_else(|_| state.public_host.clone());
        state.store.reconcile(&user, &host).await
    };

    match reconcile.await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(PanelError::ServerError(e.to_string())),
    }
}

// ================================ DATABASES ================================= //

pub async fn databases_handler(
    AuthUser(_user): AuthUser,
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, PanelError> {
    let databases = state.databases.get_databases().await?;
    Ok((NO_CACHE, Json(DataResponse::new(databases))))
}

pub async fn database_sizes_handler(
    AuthUser(_user): AuthUser,
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, PanelError> {
    let sizes = state.databases.get_database_sizes().await?;
    Ok((NO_CACHE, Json(DataResponse::new(sizes))))
}

pub async fn users_handler(
    AuthUser(_user): AuthUser,
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, PanelError> {
    let users = state.databases.get_users(&name).await?;
    Ok((NO_CACHE, Json(DataResponse::new(users))))
}

pub async fn drop_database_handler(
    AuthUser(user): AuthUser,
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, PanelError> {
    info!("{} requested to drop {}", user.login, name);
    state.databases.drop_database(&name).await?;
    Ok(redirect_to_databases())
}

pub async fn clone_database_handler(
    AuthUser(user): AuthUser,
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, PanelError> {
    info!("{} requested to clone {}", user.login, name);
    let new_name = state.databases.clone_database(&name).await?;
    Ok(Json(MessageResponse {
        message: format!("Database cloned successfully: {}", new_name),
    }))
}

/// Streams the dump while `mysqldump` produces it
pub async fn export_database_handler(
    AuthUser(_user): AuthUser,
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, PanelError> {
    let stdout = state.databases.export_database(&name)?;
    let body = Body::from_stream(ReaderStream::new(stdout));

    Ok((
        [
            (CONTENT_TYPE, "text/plain".to_string()),
            (CACHE_CONTROL, "private, max-age=5000".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename={}.sql", name),
            ),
        ],
        body,
    ))
}

pub async fn make_admin_handler(
    AuthUser(_user): AuthUser,
    method: Method,
    State(state): State<Arc<ServerState>>,
    Path((name, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, PanelError> {
    if method != Method::POST {
        return Err(PanelError::MethodNotAllowed(
            "Only POST requests are allowed".to_string(),
        ));
    }
    let user_id: i64 = id
        .parse()
        .map_err(|_| PanelError::ValidationError("User id is invalid".to_string()))?;

    state.databases.make_admin(&name, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fields of the upload form
#[derive(Debug, Default)]
struct UploadForm {
    database_name: Option<String>,
    file: Option<(PathBuf, String)>,
}

impl UploadForm {
    /// Database name, stored upload path and original file name
    fn validate(self) -> Result<(String, PathBuf, String), PanelError> {
        let Some(database_name) = self.database_name.filter(|name| !name.is_empty()) else {
            return Err(PanelError::ValidationError(
                "Database name is required".to_string(),
            ));
        };
        let Some((path, file_name)) = self.file else {
            return Err(PanelError::ValidationError(
                "No file is attached".to_string(),
            ));
        };
        Ok((database_name, path, file_name))
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> PanelError {
    PanelError::ValidationError(e.body_text())
}

async fn receive_upload(multipart: &mut Multipart, work_dir: &Dir) -> Result<UploadForm, PanelError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("databaseName") => {
                form.database_name = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let path = work_dir.path().join("upload");
                let mut file = tokio::fs::File::create(&path).await?;
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    file.write_all(&chunk).await?;
                }
                file.flush().await?;
                form.file = Some((path, file_name));
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Replace a database with an uploaded dump or archive
pub async fn upload_database_handler(
    AuthUser(user): AuthUser,
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, PanelError> {
    let work_dir = Dir::create_temp_dir("test-panel-upload").await?;

    let upload = receive_upload(&mut multipart, &work_dir)
        .await
        .and_then(UploadForm::validate);
    let (database_name, path, file_name) = match upload {
        Ok(upload) => upload,
        Err(e) => {
            if let Err(cleanup) = work_dir.delete().await {
                warn!("Unable to remove {}: {}", work_dir.path().display(), cleanup);
            }
            return Err(e);
        }
    };

    info!("{} uploaded {} for {}", user.login, file_name, database_name);
    state
        .databases
        .upload_database(&database_name, &path, &file_name, &work_dir)
        .await?;
    Ok(redirect_to_databases())
}

// ================================= ACCOUNT ================================== //

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub code: Option<String>,
}

/// Exchange an OAuth code for an access token
pub async fn login_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<LoginQuery>,
) -> Result<impl IntoResponse, PanelError> {
    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| PanelError::ValidationError("Bad request".to_string()))?;

    let token = state.github.exchange_code(&code).await.map_err(|e| match e {
        PanelError::AuthError(message) => PanelError::AuthError(message),
        other => PanelError::AuthError(other.to_string()),
    })?;
    Ok(Json(LoginResponse {
        error: false,
        data: token,
    }))
}

pub async fn user_handler(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(DataResponse::new(user.to_response()))
}

pub async fn disk_usage_handler(AuthUser(_user): AuthUser) -> Result<impl IntoResponse, PanelError> {
    let usage = disk_usage("/")?;
    Ok((NO_CACHE, Json(DataResponse::new(usage))))
}

// ================================ DOCKERHUB ================================= //

/// Proxies the tag list, since DockerHub does not send CORS headers
pub async fn dockerhub_handler(
    State(state): State<Arc<ServerState>>,
    Path(image): Path<String>,
) -> Result<impl IntoResponse, PanelError> {
    let tags = state.dockerhub.fetch_tags_for_image(&image).await?;
    Ok(Json(DataResponse::new(tags)))
}
