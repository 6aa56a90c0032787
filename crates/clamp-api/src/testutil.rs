//! Shared helpers for router tests

use crate::{AppConfig, AppState};
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use clamp_core::{Argon2Scheme, PasswordScheme};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions::cookie::Key;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    // Holds the static/upload tree alive for the duration of the test.
    _static_dir: tempfile::TempDir,
}

pub async fn test_app() -> TestApp {
    let static_dir = tempfile::tempdir().unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::db::init_schema(&pool).await.unwrap();

    let passwords: Arc<dyn PasswordScheme> = Arc::new(Argon2Scheme);
    crate::db::ensure_bootstrap_admin(&pool, passwords.as_ref(), Some("admin-pw"))
        .await
        .unwrap();

    let config = AppConfig {
        database_path: ":memory:".to_string(),
        secret_key: None,
        default_admin_password: Some("admin-pw".to_string()),
        static_dir: static_dir.path().to_string_lossy().into_owned(),
        bind_addr: "127.0.0.1:0".to_string(),
    };
    let state = Arc::new(AppState {
        db: pool,
        config,
        passwords,
    });
    let router = crate::app(state.clone(), Key::generate());
    TestApp {
        router,
        state,
        _static_dir: static_dir,
    }
}

pub fn request(
    method: &str,
    uri: &str,
    body: Option<(&str, Vec<u8>)>,
    cookie: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some((content_type, bytes)) => builder
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(bytes))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

const BOUNDARY: &str = "clamp-test-boundary";

pub fn multipart_request(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
    cookie: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
    request("POST", uri, Some((content_type.as_str(), body)), cookie)
}

/// Log in through the router and return the session cookie pair.
pub async fn login_cookie(router: &Router, username: &str, password: &str) -> String {
    let body = format!("username={username}&password={password}");
    let resp = router
        .clone()
        .oneshot(request(
            "POST",
            "/login",
            Some((
                "application/x-www-form-urlencoded",
                body.into_bytes(),
            )),
            None,
        ))
        .await
        .unwrap();
    resp.headers()
        .get(header::SET_COOKIE)
        .expect("login should establish a session")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn create_user(
    state: &AppState,
    username: &str,
    password: &str,
    is_admin: bool,
    force_password_change: bool,
) {
    let digest = state.passwords.hash_password(password).unwrap();
    sqlx::query(
        "INSERT INTO user (username, password_hash, is_admin, force_password_change, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(username)
    .bind(digest)
    .bind(is_admin)
    .bind(force_password_change)
    .bind(Utc::now().naive_utc())
    .execute(&state.db)
    .await
    .unwrap();
}

pub async fn insert_clamp(state: &AppState) -> i64 {
    let result = sqlx::query(
        "INSERT INTO clamp_data (location, clamp_date, time_in, offense, payment_status,
            amount_paid, created_at)
         VALUES ('Main St', '2025-11-27', '12:00:00', 'Blocking driveway', 'Processing',
            0.0, ?1)",
    )
    .bind(Utc::now().naive_utc())
    .execute(&state.db)
    .await
    .unwrap();
    result.last_insert_rowid()
}

pub async fn insert_appeal(state: &AppState, clamp_id: i64) -> i64 {
    let result = sqlx::query(
        "INSERT INTO appeal (clamp_id, appeal_date, appeal_reason, appeal_status, created_at)
         VALUES (?1, '2025-11-28', 'Sign was obscured', 'Pending', ?2)",
    )
    .bind(clamp_id)
    .bind(Utc::now().naive_utc())
    .execute(&state.db)
    .await
    .unwrap();
    result.last_insert_rowid()
}
