//! JWT session tokens.
//!
//! A session is a signed, short-lived JWT stored in an HTTP-only cookie.
//! The token carries just enough to identify the user; the extractor
//! reloads the row on every request so blocks and role changes take
//! effect immediately.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::models::users::UserDBResponse;
use crate::errors::{Error, Result};
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: UserId,
    pub email: String,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
}

/// Create a signed session token for a user.
pub fn create_session_token(user: &UserDBResponse, secret: &str, expiry: Duration) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        exp: now + expiry.as_secs() as i64,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Other(anyhow::anyhow!("failed to sign session token: {e}")))
}

/// Verify a session token and return its claims.
///
/// Expired or tampered tokens map to [`Error::Unauthenticated`]; anything
/// else (a broken key, an unsupported algorithm) is an internal error.
pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => Error::Unauthenticated {
                message: Some("Session has expired, please log in again".to_string()),
            },
            ErrorKind::InvalidToken | ErrorKind::InvalidSignature | ErrorKind::Base64(_) => {
                Error::Unauthenticated {
                    message: Some("Invalid session token".to_string()),
                }
            }
            _ => Error::Other(anyhow::anyhow!("failed to verify session token: {e}")),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user() -> UserDBResponse {
        UserDBResponse {
            id: 42,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: Some("x".to_string()),
            is_staff: true,
            is_superuser: false,
            is_blocked: false,
            email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_roundtrip() {
        let token =
            create_session_token(&test_user(), "secret", Duration::from_secs(3600)).unwrap();
        let claims = verify_session_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "alice@example.com");
        assert!(claims.is_staff);
        assert!(!claims.is_superuser);
    }

    #[test]
    fn test_wrong_secret_is_unauthenticated() {
        let token =
            create_session_token(&test_user(), "secret", Duration::from_secs(3600)).unwrap();
        let err = verify_session_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        // Expired well past the default validation leeway
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: 42,
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            is_staff: false,
            is_superuser: false,
            exp: now - 600,
            iat: now - 4200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let err = verify_session_token(&token, "secret").unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_garbage_token_is_unauthenticated() {
        let err = verify_session_token("not.a.jwt", "secret").unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }
}
