//! Registration, login and logout.

use axum::extract::State;
use axum::Json;
use tracing::{info, instrument};

use crate::api::models::auth::{LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse};
use crate::auth::password::{hash_string, verify_string, Argon2Params};
use crate::auth::session::create_session_token;
use crate::config::Config;
use crate::db::handlers::{Repository, Users};
use crate::db::models::users::UserCreateDBRequest;
use crate::errors::{Error, Result};
use crate::AppState;

/// Build the session cookie string.
fn session_cookie(config: &Config, token: &str, max_age_secs: i64) -> String {
    let session = &config.auth.native.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session.cookie_name, token, session.cookie_same_site, max_age_secs
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn check_password_length(config: &Config, password: &str) -> Result<()> {
    let policy = &config.auth.native.password;
    if password.len() < policy.min_length {
        return Err(Error::BadRequest {
            message: format!(
                "Password must be at least {} characters long",
                policy.min_length
            ),
        });
    }
    if password.len() > policy.max_length {
        return Err(Error::BadRequest {
            message: format!(
                "Password must be at most {} characters long",
                policy.max_length
            ),
        });
    }
    Ok(())
}

/// Register a new account.
#[utoipa::path(
    post,
    path = "/authentication/register",
    tag = "authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email or username already taken"),
    )
)]
#[instrument(skip_all, fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<RegisterResponse> {
    let config = &state.config;
    if !config.auth.native.enabled || !config.auth.native.allow_registration {
        return Err(Error::Forbidden {
            action: "register".to_string(),
            resource: "new accounts".to_string(),
        });
    }
    if request.username.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Username must not be empty".to_string(),
        });
    }
    if !request.email.contains('@') {
        return Err(Error::BadRequest {
            message: "Invalid email address".to_string(),
        });
    }
    check_password_length(config, &request.password)?;

    let params = Argon2Params::from(&config.auth.native.password);
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_string(&password, params))
        .await
        .map_err(|_| Error::Internal {
            operation: "hash password".to_string(),
        })??;

    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            username: request.username,
            email: request.email,
            password_hash: Some(password_hash),
            is_staff: false,
            is_superuser: false,
            email_verified: false,
        })
        .await?;

    info!(user_id = user.id, "user registered");

    let expiry = config.auth.security.jwt_expiry;
    let token = create_session_token(&user, &config.secret_key, expiry)?;
    Ok(RegisterResponse {
        user: user.into(),
        cookie: session_cookie(config, &token, expiry.as_secs() as i64),
    })
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/authentication/login",
    tag = "authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is blocked"),
    )
)]
#[instrument(skip_all, fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<LoginResponse> {
    let config = &state.config;
    if !config.auth.native.enabled {
        return Err(Error::Forbidden {
            action: "log in to".to_string(),
            resource: "this instance".to_string(),
        });
    }

    let invalid = || Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    };

    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let user = Users::new(&mut conn)
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;

    let stored_hash = user.password_hash.clone().ok_or_else(invalid)?;
    let password = request.password.clone();
    let matches = tokio::task::spawn_blocking(move || verify_string(&password, &stored_hash))
        .await
        .map_err(|_| Error::Internal {
            operation: "verify password".to_string(),
        })??;
    if !matches {
        return Err(invalid());
    }

    if user.is_blocked {
        return Err(Error::Forbidden {
            action: "access".to_string(),
            resource: "this service: account is blocked".to_string(),
        });
    }

    info!(user_id = user.id, "user logged in");

    let expiry = config.auth.security.jwt_expiry;
    let token = create_session_token(&user, &config.secret_key, expiry)?;
    Ok(LoginResponse {
        user: user.into(),
        cookie: session_cookie(config, &token, expiry.as_secs() as i64),
    })
}

/// Log out, clearing the session cookie.
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses((status = 200, description = "Logged out", body = LogoutResponse))
)]
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> LogoutResponse {
    LogoutResponse {
        message: "Logged out".to_string(),
        cookie: session_cookie(&state.config, "", 0),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::UserResponse;
    use crate::test_utils::*;
    use axum::http::{header, StatusCode};
    use serde_json::json;
    use sqlx::SqlitePool;

    fn session_cookie_from(response: &axum_test::TestResponse) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("response should set a session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_sets_session_cookie(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;

        let response = app
            .post("/authentication/register")
            .json(&json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "correct horse battery"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let cookie = session_cookie_from(&response);
        assert!(cookie.starts_with("mailcast_session="));

        // The cookie authenticates follow-up requests
        let me = app
            .get("/api/v1/users/me")
            .add_header(header::COOKIE, cookie)
            .await;
        me.assert_status_ok();
        let user: UserResponse = me.json();
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.is_staff);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_rejects_duplicate_email(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;

        let body = json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "correct horse battery"
        });
        app.post("/authentication/register").json(&body).await.assert_status(StatusCode::CREATED);

        let response = app
            .post("/authentication/register")
            .json(&json!({
                "username": "alice2",
                "email": "alice@example.com",
                "password": "correct horse battery"
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert!(response.text().contains("already exists"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_rejects_short_password(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;

        let response = app
            .post("/authentication/register")
            .json(&json!({
                "username": "bob",
                "email": "bob@example.com",
                "password": "short"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_roundtrip_and_wrong_password(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;

        app.post("/authentication/register")
            .json(&json!({
                "username": "carol",
                "email": "carol@example.com",
                "password": "a fine password"
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = app
            .post("/authentication/login")
            .json(&json!({"email": "carol@example.com", "password": "a fine password"}))
            .await;
        response.assert_status_ok();
        assert!(session_cookie_from(&response).starts_with("mailcast_session="));

        let response = app
            .post("/authentication/login")
            .json(&json!({"email": "carol@example.com", "password": "not the password"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        // Unknown email gets the same message as a bad password
        let response = app
            .post("/authentication/login")
            .json(&json!({"email": "nobody@example.com", "password": "whatever"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_blocked_user_cannot_log_in(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;

        app.post("/authentication/register")
            .json(&json!({
                "username": "dave",
                "email": "dave@example.com",
                "password": "a fine password"
            }))
            .await
            .assert_status(StatusCode::CREATED);

        sqlx::query("UPDATE users SET is_blocked = TRUE WHERE email = ?")
            .bind("dave@example.com")
            .execute(&pool)
            .await
            .unwrap();

        let response = app
            .post("/authentication/login")
            .json(&json!({"email": "dave@example.com", "password": "a fine password"}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_logout_clears_cookie(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;

        let response = app.post("/authentication/logout").await;
        response.assert_status_ok();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unauthenticated_request_is_rejected(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;
        app.get("/api/v1/clients").await.assert_status(StatusCode::UNAUTHORIZED);
    }
}
