//! # mailcast: Email Campaign Service
//!
//! `mailcast` is a small service for managing email campaigns. It provides a
//! RESTful API for managing clients (recipients), reusable message templates,
//! and mailings that tie a template to a recipient list, along with a
//! delivery engine that sends campaigns and records every attempt.
//!
//! ## Overview
//!
//! Users register, log in, and manage their own clients and mailings. Staff
//! accounts get a read-only view across all users and can deactivate
//! mailings or block accounts; superusers additionally manage roles and can
//! edit anyone's data.
//!
//! Delivery is deliberately simple: a mailing is sent sequentially, one
//! recipient at a time, over SMTP (or to files in development). Each
//! attempt is recorded with its outcome and the server response, and a
//! layer of short-lived caches makes re-triggering a mailing cheap and
//! keeps recent duplicates from going out twice. See [`sender`] for the
//! details.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use mailcast::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = mailcast::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     mailcast::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! The application uses SQLite for persistence and runs migrations on
//! startup. An initial admin account is created from configuration if it
//! does not already exist.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use bon::Builder;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, instrument, warn, Level};
use utoipa::OpenApi;

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod errors;
pub mod openapi;
pub mod sender;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

pub use config::Config;
pub use types::{AttemptId, ClientId, MailingId, MessageId, UserId};

use crate::auth::password::{hash_string, Argon2Params};
use crate::db::handlers::{Repository, Users};
use crate::db::models::users::UserCreateDBRequest;
use crate::email::EmailService;
use crate::openapi::ApiDoc;
use crate::sender::SendCaches;

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub email: Arc<EmailService>,
    #[builder(default)]
    pub caches: SendCaches,
}

/// Get the mailcast database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing user with the configured email is left alone
/// apart from a password update when a password is configured. Called on
/// startup so there is always a superuser to log in with.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(
    email: &str,
    password: Option<&str>,
    params: Argon2Params,
    db: &SqlitePool,
) -> anyhow::Result<UserId> {
    let password_hash = password
        .map(|pwd| hash_string(pwd, params))
        .transpose()
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?;

    let mut tx = db.begin().await?;
    let mut users = Users::new(&mut tx);

    if let Some(existing) = users.get_user_by_email(email).await? {
        if let Some(password_hash) = password_hash {
            sqlx::query("UPDATE users SET password_hash = ? WHERE email = ?")
                .bind(password_hash)
                .bind(email)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        return Ok(existing.id);
    }

    let created = users
        .create(&UserCreateDBRequest {
            username: email.to_string(),
            email: email.to_string(),
            password_hash,
            is_staff: true,
            is_superuser: true,
            email_verified: true,
        })
        .await?;
    tx.commit().await?;
    info!(user_id = created.id, "created initial admin user");
    Ok(created.id)
}

/// Connect to the database, run migrations, and seed the admin account.
pub async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePool::connect(&config.database_url).await?;
    migrator().run(&pool).await?;

    create_initial_admin_user(
        &config.admin_email,
        config.admin_password.as_deref(),
        Argon2Params::from(&config.auth.native.password),
        &pool,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Authentication routes at root level, can be masked when deployed
    // behind an SSO proxy
    let auth_routes = Router::new()
        .route("/authentication/register", post(api::handlers::auth::register))
        .route("/authentication/login", post(api::handlers::auth::login))
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .with_state(state.clone());

    let api_routes = Router::new()
        // Client management
        .route("/clients", get(api::handlers::clients::list_clients))
        .route("/clients", post(api::handlers::clients::create_client))
        .route("/clients/{id}", get(api::handlers::clients::get_client))
        .route("/clients/{id}", put(api::handlers::clients::update_client))
        .route("/clients/{id}", delete(api::handlers::clients::delete_client))
        // Message templates
        .route("/messages", get(api::handlers::messages::list_messages))
        .route("/messages", post(api::handlers::messages::create_message))
        .route("/messages/{id}", get(api::handlers::messages::get_message))
        .route("/messages/{id}", put(api::handlers::messages::update_message))
        .route("/messages/{id}", delete(api::handlers::messages::delete_message))
        // Mailings and delivery
        .route("/mailings", get(api::handlers::mailings::list_mailings))
        .route("/mailings", post(api::handlers::mailings::create_mailing))
        .route("/mailings/{id}", get(api::handlers::mailings::get_mailing))
        .route("/mailings/{id}", put(api::handlers::mailings::update_mailing))
        .route("/mailings/{id}", delete(api::handlers::mailings::delete_mailing))
        .route("/mailings/{id}/send", post(api::handlers::mailings::send_mailing))
        .route("/mailings/{id}/toggle", post(api::handlers::mailings::toggle_mailing))
        .route("/mailings/{id}/attempts", get(api::handlers::mailings::list_attempts))
        .route("/mailings/{id}/stats", get(api::handlers::mailings::mailing_stats))
        // User administration
        .route("/users", get(api::handlers::users::list_users))
        .route("/users/me", get(api::handlers::users::get_me))
        .route("/users/overview", get(api::handlers::users::manager_overview))
        .route("/users/{id}", get(api::handlers::users::get_user))
        .route("/users/{id}/block", post(api::handlers::users::block_user))
        .route("/users/{id}/unblock", post(api::handlers::users::unblock_user))
        .route("/users/{id}/promote", post(api::handlers::users::promote_user))
        .route("/users/{id}/demote", post(api::handlers::users::demote_user))
        // Dashboard
        .route("/dashboard", get(api::handlers::dashboard::dashboard))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route(
            "/api-docs/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        )
        .merge(auth_routes)
        .nest("/api/v1", api_routes);

    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, and seeds the admin account
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting mailcast with configuration: {:#?}", config);
        if config.secret_key == "insecure-dev-secret" {
            warn!("Using the default secret_key; set a real one in any deployment");
        }
        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create an application on top of an existing pool (used in tests,
    /// where migrations have already been applied).
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let email = Arc::new(EmailService::new(&config)?);
        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .email(email)
            .build();

        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            config,
            pool,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "mailcast listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
