//! HTTP API tests against the router, with GitHub faked out

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, COOKIE, LOCATION, ORIGIN};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use testpanel::database::Databases;
use testpanel::deploy::auto::AutoDeployOptions;
use testpanel::deploy::compose::ComposeEnvironment;
use testpanel::deploy::store::StateStore;
use testpanel::http::client::HttpClient;
use testpanel::http::dockerhub::DockerHubClient;
use testpanel::server::serve::router;
use testpanel::server::state::ServerState;
use testpanel::storage::layout::StorageLayout;
use testpanel::storage::settings::{DockerHubSettings, MysqlSettings};

use crate::support::{FakeGithub, FakeSource};

fn app(dir: &TempDir) -> Router {
    let layout = StorageLayout::new(
        dir.path().join("config"),
        dir.path().join("state"),
        dir.path().join("nginx"),
    );
    let store = Arc::new(StateStore::new(
        &layout,
        Arc::new(FakeSource::new(&[])),
        AutoDeployOptions::default(),
        ComposeEnvironment::default(),
    ));
    let dockerhub = Arc::new(DockerHubClient::new(
        HttpClient::new().unwrap(),
        DockerHubSettings::default(),
    ));
    let state = ServerState::new(
        Arc::new(FakeGithub),
        store,
        Arc::new(Databases::new(&MysqlSettings::default())),
        dockerhub,
        None,
        "test.example.org".to_string(),
    );
    router(Arc::new(state))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(COOKIE, "theme=dark; token=good")
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(COOKIE, "token=good")
        .header(CONTENT_TYPE, "application/json")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_missing_token_is_forbidden() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(Request::builder().uri("/api/user").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await, json!({ "error": "User not authenticated" }));
}

#[tokio::test]
async fn test_rejected_token_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let request = Request::builder()
        .uri("/api/user")
        .header(COOKIE, "token=expired")
        .body(Body::empty())
        .unwrap();

    let response = app(&dir).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "Bad credentials" }));
}

#[tokio::test]
async fn test_user_omits_token() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir).oneshot(get("/api/user")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["login"], "tess");
    assert_eq!(body["data"]["organization"]["teams"]["Testing"], json!(["tess", "carol"]));
    assert!(body["data"].get("token").is_none());
}

#[tokio::test]
async fn test_get_state_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir).oneshot(get("/api/state")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CACHE_CONTROL]
        .to_str()
        .unwrap()
        .contains("no-store"));
    assert_eq!(body_json(response).await, json!({ "data": [] }));
}

#[tokio::test]
async fn test_set_state_requires_origin() {
    let dir = TempDir::new().unwrap();
    let request = post("/api/state").body(Body::from("[]")).unwrap();

    let response = app(&dir).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "\"Origin\" request header is missing" })
    );
}

#[tokio::test]
async fn test_set_state_rejects_invalid_body() {
    let dir = TempDir::new().unwrap();
    let request = post("/api/state")
        .header(ORIGIN, "https://test.example.org")
        .body(Body::from(r#"{"branch": "main"}"#))
        .unwrap();

    let response = app(&dir).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid request body specified" })
    );
}

#[tokio::test]
async fn test_set_state_returns_formalized_state() {
    let dir = TempDir::new().unwrap();
    let body = json!([
        { "branch": "main", "database": "sp7demo", "schemaVersion": "6.8.03" }
    ])
    .to_string();
    let request = post("/api/state")
        .header(ORIGIN, "https://test.example.org")
        .body(Body::from(body))
        .unwrap();

    let response = app(&dir).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["hostname"], "sp7demo-main");
    assert_eq!(body["data"][0]["wasAutoDeployed"], false);
    assert!(body["data"][0]["deployedAt"].is_i64());

    let nginx = std::fs::read_to_string(dir.path().join("nginx").join("nginx.conf")).unwrap();
    assert!(nginx.contains("server_name sp7demo-main.test.example.org;"));
}

#[tokio::test]
async fn test_ping_unknown_index() {
    let dir = TempDir::new().unwrap();
    let request = post("/api/state/5/ping")
        .header(ORIGIN, "https://test.example.org")
        .body(Body::empty())
        .unwrap();

    let response = app(&dir).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "Invalid index" }));
}

#[tokio::test]
async fn test_invalid_database_name() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(get("/api/databases/bad-name/users"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "Database name is invalid" }));
}

#[tokio::test]
async fn test_drop_invalid_database_does_not_redirect() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(get("/api/databases/db;drop/drop"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(LOCATION).is_none());
}

fn upload(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/databases/upload")
        .header(COOKIE, "token=good")
        .header(CONTENT_TYPE, "multipart/form-data; boundary=PANEL")
        .body(Body::from(body.replace('\n', "\r\n")))
        .unwrap()
}

#[tokio::test]
async fn test_upload_requires_database_name() {
    let dir = TempDir::new().unwrap();
    let body = "--PANEL
Content-Disposition: form-data; name=\"file\"; filename=\"dump.sql\"
Content-Type: application/sql

SELECT 1;
--PANEL--
";

    let response = app(&dir).oneshot(upload(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Database name is required" })
    );
}

#[tokio::test]
async fn test_upload_requires_file() {
    let dir = TempDir::new().unwrap();
    let body = "--PANEL
Content-Disposition: form-data; name=\"databaseName\"

kufish
--PANEL--
";

    let response = app(&dir).oneshot(upload(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "No file is attached" }));
}

#[tokio::test]
async fn test_make_admin_requires_post() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(get("/api/databases/sp7demo/user/1/make-admin"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Only POST requests are allowed" })
    );
}

#[tokio::test]
async fn test_make_admin_rejects_invalid_user_id() {
    let dir = TempDir::new().unwrap();
    let request = post("/api/databases/sp7demo/user/abc/make-admin")
        .body(Body::empty())
        .unwrap();

    let response = app(&dir).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "User id is invalid" }));
}

#[tokio::test]
async fn test_login_requires_code() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(Request::builder().uri("/api/login").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "Bad request" }));
}

#[tokio::test]
async fn test_login_exchanges_code() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(
            Request::builder()
                .uri("/api/login?code=valid-code")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "error": false, "data": "gho_access_token" })
    );
}

#[tokio::test]
async fn test_login_reports_provider_error() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(
            Request::builder()
                .uri("/api/login?code=reused")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "The code passed is incorrect or expired." })
    );
}

#[tokio::test]
async fn test_webhook_without_personal_token_fails() {
    let dir = TempDir::new().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .body(Body::empty())
        .unwrap();

    let response = app(&dir).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_dockerhub_rejects_invalid_image() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(Request::builder().uri("/api/dockerhub/Specify7").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "Image name is invalid" }));
}
