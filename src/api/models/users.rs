//! API models for user accounts.

use crate::api::models::pagination::Pagination;
use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// The authenticated user attached to a request.
///
/// Loaded fresh from the database by the extractor so that blocking and
/// role changes take effect on the next request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_blocked: bool,
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            is_staff: db.is_staff,
            is_superuser: db.is_superuser,
            is_blocked: db.is_blocked,
        }
    }
}

/// Public representation of a user account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_blocked: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            is_staff: db.is_staff,
            is_superuser: db.is_superuser,
            is_blocked: db.is_blocked,
            email_verified: db.email_verified,
            created_at: db.created_at,
        }
    }
}

/// Query parameters for listing users.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// Per-role account totals for the manager overview.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ManagerOverview {
    /// Staff accounts that are not superusers
    pub managers: i64,
    /// Regular accounts (neither staff nor superuser)
    pub users: i64,
    pub superusers: i64,
}
