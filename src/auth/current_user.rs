//! Request extractor for the authenticated user.
//!
//! Authentication methods are tried in order; the first that applies
//! decides the outcome:
//!
//! 1. Trusted proxy header (when enabled in config)
//! 2. Session cookie (JWT)
//!
//! Each method returns `Option<Result<CurrentUser>>`: `None` means "not my
//! request, try the next method", `Some(Err)` means the method applied and
//! failed. The user row is reloaded from the database on every request so
//! a block takes effect on the next request, not at the next login.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::models::users::CurrentUser;
use crate::auth::session::verify_session_token;
use crate::config::Config;
use crate::db::handlers::{Repository, Users};
use crate::errors::{Error, Result};
use crate::AppState;

/// Pull a named cookie out of the `Cookie` header.
fn extract_cookie(parts: &Parts, name: &str) -> Option<String> {
    let header = parts.headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Load a user row and convert it, rejecting blocked accounts.
async fn load_user(state: &AppState, id: crate::types::UserId) -> Result<CurrentUser> {
    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let user = Users::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or(Error::Unauthenticated {
            message: Some("Session user no longer exists".to_string()),
        })?;
    if user.is_blocked {
        return Err(Error::Forbidden {
            action: "access".to_string(),
            resource: "this service: account is blocked".to_string(),
        });
    }
    Ok(user.into())
}

/// Trusted proxy header auth. Only active when enabled in config; looks up
/// the user by the email carried in the header.
async fn try_proxy_header_auth(
    parts: &Parts,
    state: &AppState,
    config: &Config,
) -> Option<Result<CurrentUser>> {
    if !config.auth.proxy_header.enabled {
        return None;
    }
    let email = parts
        .headers
        .get(&config.auth.proxy_header.header_name)?
        .to_str()
        .ok()?
        .to_string();

    Some(async {
        let mut conn = state
            .db
            .acquire()
            .await
            .map_err(crate::db::errors::DbError::from)?;
        let user = Users::new(&mut conn)
            .get_user_by_email(&email)
            .await?
            .ok_or(Error::Unauthenticated {
                message: Some("Unknown user in proxy header".to_string()),
            })?;
        drop(conn);
        load_user(state, user.id).await
    }
    .await)
}

/// Session cookie auth.
async fn try_session_cookie_auth(
    parts: &Parts,
    state: &AppState,
    config: &Config,
) -> Option<Result<CurrentUser>> {
    let token = extract_cookie(parts, &config.auth.native.session.cookie_name)?;

    Some(async {
        let claims = verify_session_token(&token, &config.secret_key)?;
        load_user(state, claims.sub).await
    }
    .await)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let config = &state.config;

        if let Some(result) = try_proxy_header_auth(parts, state, config).await {
            return result;
        }
        if let Some(result) = try_session_cookie_auth(parts, state, config).await {
            return result;
        }

        Err(Error::Unauthenticated { message: None })
    }
}
