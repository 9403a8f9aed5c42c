use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bridge_api::{app, config::Config, service::config::ConfigServiceImpl, state::AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const PASSWORD: &str = "Abcdef1!";

async fn test_app(dir: &TempDir) -> Router {
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        watch_timeout_seconds: 1,
        ..Config::default()
    };
    let state = AppState::new(Arc::new(ConfigServiceImpl::with_values(config)))
        .await
        .unwrap();
    app(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or_default().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, set_cookie, json)
}

async fn login_main_admin(app: &Router) -> String {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/api/v1/admin/auth/register",
        Some(json!({ "email": "Main@Example.com", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isMainAdmin"], true);
    assert_eq!(body["isVerified"], true);

    let (status, cookie, _) = send(
        app,
        Method::POST,
        "/api/v1/admin/auth/login",
        Some(json!({ "email": "main@example.com", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.expect("login sets the session cookie");
    assert!(cookie.starts_with("sid="));
    cookie
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (status, _, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "bridge-api");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (status, _, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/submissions/{id}/status"].is_object());
}

#[tokio::test]
async fn submission_lifecycle() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/v1/submissions",
        Some(json!({ "id": "alice", "tiktokUsername": "alice_tt" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tiktokUsername"], "alice_tt");
    assert_eq!(body["tiktokUsernameStatus"], "pending");
    assert_eq!(body["isVerified"], false);

    let (status, _, body) = send(&app, Method::GET, "/api/v1/submissions/alice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");

    // Reviewing needs a session.
    let (status, _, body) = send(
        &app,
        Method::PATCH,
        "/api/v1/submissions/alice/status",
        Some(json!({ "step": "tiktokUsername", "status": "approved" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "missing_session");

    let cookie = login_main_admin(&app).await;

    let (status, _, body) = send(
        &app,
        Method::PATCH,
        "/api/v1/submissions/alice/status",
        Some(json!({ "step": "tiktokUsername", "status": "approved" })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tiktokUsernameStatus"], "approved");

    let (status, _, body) = send(
        &app,
        Method::PATCH,
        "/api/v1/submissions/alice/status",
        Some(json!({ "step": "nonsense", "status": "approved" })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_step");

    send(
        &app,
        Method::POST,
        "/api/v1/submissions",
        Some(json!({ "id": "alice", "finalCode": "FC-1" })),
        None,
    )
    .await;
    let (status, _, body) = send(
        &app,
        Method::PATCH,
        "/api/v1/submissions/alice/status",
        Some(json!({ "step": "finalCode", "status": "approved" })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isVerified"], true);

    let (status, _, body) =
        send(&app, Method::GET, "/api/v1/submissions", None, Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    for _ in 0..2 {
        let (status, _, _) = send(
            &app,
            Method::DELETE,
            "/api/v1/submissions/alice",
            None,
            Some(&cookie),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (status, _, body) = send(&app, Method::GET, "/api/v1/submissions/alice", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "submission_not_found");
}

#[tokio::test]
async fn submit_without_id_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/v1/submissions",
        Some(json!({ "tiktokUsername": "nobody" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_id");
}

#[tokio::test]
async fn watch_returns_newer_version_and_times_out() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (_, _, created) = send(
        &app,
        Method::POST,
        "/api/v1/submissions",
        Some(json!({ "id": "bob" })),
        None,
    )
    .await;
    let version = created["version"].as_u64().unwrap();

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/api/v1/submissions/bob/watch?since=0",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"].as_u64(), Some(version));

    // Nothing changes, so the request returns the same record after the timeout.
    let uri = format!("/api/v1/submissions/bob/watch?since={version}");
    let (status, _, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"].as_u64(), Some(version));

    let (status, _, _) = send(
        &app,
        Method::GET,
        "/api/v1/submissions/missing/watch",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn phone_number_pool() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/v1/admin/phone-numbers",
        Some(json!({ "phoneNumber": "+15550100" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cookie = login_main_admin(&app).await;
    let (status, _, number) = send(
        &app,
        Method::POST,
        "/api/v1/admin/phone-numbers",
        Some(json!({ "phoneNumber": "+15550100", "region": "US", "state": "CA" })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let number_id = number["id"].as_str().unwrap().to_string();

    let (_, _, available) = send(&app, Method::GET, "/api/v1/phone-numbers", None, None).await;
    assert_eq!(available.as_array().map(Vec::len), Some(1));

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/v1/submissions",
        Some(json!({ "id": "carol", "phoneNumberId": number_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phoneNumber"], "+15550100");
    assert_eq!(body["phoneNumberStatus"], "pending");

    let (_, _, available) = send(&app, Method::GET, "/api/v1/phone-numbers", None, None).await;
    assert_eq!(available.as_array().map(Vec::len), Some(0));

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/v1/submissions",
        Some(json!({ "id": "dave", "phoneNumberId": number_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "phone_number_unavailable");

    // Deleting the holder frees the number again.
    send(
        &app,
        Method::DELETE,
        "/api/v1/submissions/carol",
        None,
        Some(&cookie),
    )
    .await;
    let (_, _, available) = send(&app, Method::GET, "/api/v1/phone-numbers", None, None).await;
    assert_eq!(available.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn second_admin_waits_for_approval() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;
    let main_cookie = login_main_admin(&app).await;

    let (status, _, second) = send(
        &app,
        Method::POST,
        "/api/v1/admin/auth/register",
        Some(json!({ "email": "second@example.com", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["isVerified"], false);

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/v1/admin/auth/login",
        Some(json!({ "email": "second@example.com", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "admin_not_verified");

    let uri = format!(
        "/api/v1/admin/admins/{}/approve",
        second["id"].as_str().unwrap()
    );
    let (status, _, body) = send(&app, Method::POST, &uri, None, Some(&main_cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isVerified"], true);

    let (status, second_cookie, _) = send(
        &app,
        Method::POST,
        "/api/v1/admin/auth/login",
        Some(json!({ "email": "second@example.com", "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second_cookie = second_cookie.unwrap();

    let (status, _, body) =
        send(&app, Method::GET, "/api/v1/admin/me", None, Some(&second_cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "second@example.com");

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/v1/admin/auth/logout",
        None,
        Some(&second_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) =
        send(&app, Method::GET, "/api/v1/admin/me", None, Some(&second_cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
