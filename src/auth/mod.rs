//! Authentication and authorization.
//!
//! Authentication is session-based: users log in with email/password and
//! receive a JWT in an HTTP-only cookie. A trusted proxy header can be
//! enabled instead for SSO deployments.
//!
//! Authorization is a set of composable gates checked in front of
//! handlers:
//!
//! - **authenticated**: the [`current_user`] extractor rejects requests
//!   without valid credentials (401)
//! - **not-blocked**: blocked accounts are rejected inside the extractor,
//!   so the gate applies to every authenticated route (403)
//! - **owns-object**: non-staff users may only touch their own rows
//! - **is-staff** / **is-superuser**: administrative operations
//!
//! # Modules
//!
//! - [`current_user`]: `FromRequestParts` extractor for the authenticated user
//! - [`password`]: Argon2 password hashing and verification
//! - [`session`]: JWT session token creation and verification

pub mod current_user;
pub mod password;
pub mod session;

use crate::api::models::users::CurrentUser;
use crate::errors::{Error, Result};

/// Gate: the user must be staff (or superuser).
pub fn require_staff(user: &CurrentUser, action: &str, resource: &str) -> Result<()> {
    if user.is_staff || user.is_superuser {
        Ok(())
    } else {
        Err(Error::Forbidden {
            action: action.to_string(),
            resource: resource.to_string(),
        })
    }
}

/// Gate: the user must be a superuser.
pub fn require_superuser(user: &CurrentUser, action: &str, resource: &str) -> Result<()> {
    if user.is_superuser {
        Ok(())
    } else {
        Err(Error::Forbidden {
            action: action.to_string(),
            resource: resource.to_string(),
        })
    }
}

/// Gate: the user must own the object, identified by its nullable owner
/// column. Superusers bypass the check; staff do not (read access for
/// staff is granted at the call sites that allow it).
pub fn require_owner(user: &CurrentUser, owner_id: Option<i64>, action: &str, resource: &str) -> Result<()> {
    if user.is_superuser || owner_id == Some(user.id) {
        Ok(())
    } else {
        Err(Error::Forbidden {
            action: action.to_string(),
            resource: resource.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_staff: bool, is_superuser: bool) -> CurrentUser {
        CurrentUser {
            id: 1,
            username: "u".to_string(),
            email: "u@example.com".to_string(),
            is_staff,
            is_superuser,
            is_blocked: false,
        }
    }

    #[test]
    fn test_staff_gate() {
        assert!(require_staff(&user(false, false), "list", "users").is_err());
        assert!(require_staff(&user(true, false), "list", "users").is_ok());
        assert!(require_staff(&user(false, true), "list", "users").is_ok());
    }

    #[test]
    fn test_superuser_gate() {
        assert!(require_superuser(&user(true, false), "promote", "user").is_err());
        assert!(require_superuser(&user(false, true), "promote", "user").is_ok());
    }

    #[test]
    fn test_owner_gate() {
        let me = user(false, false);
        assert!(require_owner(&me, Some(1), "update", "client").is_ok());
        assert!(require_owner(&me, Some(2), "update", "client").is_err());
        // Legacy rows without an owner are not editable by regular users
        assert!(require_owner(&me, None, "update", "client").is_err());
        // Superusers bypass ownership
        assert!(require_owner(&user(false, true), Some(2), "update", "client").is_ok());
    }
}
