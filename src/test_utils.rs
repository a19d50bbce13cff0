//! Test utilities for integration testing.
//!
//! Tests authenticate through the trusted proxy header, which is enabled in
//! the test configuration. Email delivery goes to a temporary directory so
//! each test can inspect exactly what was written.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use axum_test::TestServer;
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::api::models::users::UserResponse;
use crate::config::{Config, EmailConfig, EmailTransportConfig, ProxyHeaderAuthConfig};
use crate::db::handlers::{Repository, Users};
use crate::db::models::users::UserCreateDBRequest;
use crate::email::EmailService;
use crate::AppState;

static NEXT_USER: AtomicU64 = AtomicU64::new(1);

/// Build a config suitable for tests: file email transport into the given
/// directory, proxy header auth enabled, cheap password hashing.
pub fn create_test_config(email_dir: &Path) -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: "test-secret-key-for-testing-only".to_string(),
        email: EmailConfig {
            transport: EmailTransportConfig::File {
                path: email_dir.to_string_lossy().to_string(),
            },
            ..Default::default()
        },
        ..Default::default()
    };
    config.auth.proxy_header = ProxyHeaderAuthConfig {
        enabled: true,
        ..Default::default()
    };
    config.auth.native.password.argon2_memory_kib = 8;
    config.auth.native.password.argon2_iterations = 1;
    config
}

/// Application state over the given pool, with emails written to a fresh
/// temporary directory. The directory guard must be kept alive for the
/// duration of the test.
pub async fn create_test_state(pool: SqlitePool) -> (AppState, TempDir) {
    let email_dir = tempfile::tempdir().expect("Failed to create temp email dir");
    let config = create_test_config(email_dir.path());
    let email = EmailService::new(&config).expect("Failed to create email service");
    let state = AppState::builder()
        .db(pool)
        .config(config)
        .email(std::sync::Arc::new(email))
        .build();
    (state, email_dir)
}

/// Full application as a test server.
pub async fn create_test_app(pool: SqlitePool) -> (TestServer, TempDir) {
    let email_dir = tempfile::tempdir().expect("Failed to create temp email dir");
    let config = create_test_config(email_dir.path());

    let app = crate::Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application");

    (app.into_test_server(), email_dir)
}

async fn create_user_with_flags(pool: &SqlitePool, is_staff: bool, is_superuser: bool) -> UserResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let n = NEXT_USER.fetch_add(1, Ordering::Relaxed);
    let username = format!("testuser_{n}_{}", std::process::id());
    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            password_hash: None,
            is_staff,
            is_superuser,
            email_verified: true,
        })
        .await
        .expect("Failed to create test user");
    user.into()
}

pub async fn create_test_user(pool: &SqlitePool) -> UserResponse {
    create_user_with_flags(pool, false, false).await
}

pub async fn create_test_staff_user(pool: &SqlitePool) -> UserResponse {
    create_user_with_flags(pool, true, false).await
}

pub async fn create_test_superuser(pool: &SqlitePool) -> UserResponse {
    create_user_with_flags(pool, false, true).await
}

/// Proxy auth header pair for the given user, for use with `add_header`.
pub fn add_auth_headers(user: &UserResponse) -> (axum::http::HeaderName, axum::http::HeaderValue) {
    (
        axum::http::HeaderName::from_static("x-forwarded-user"),
        axum::http::HeaderValue::from_str(&user.email).expect("email is a valid header value"),
    )
}
