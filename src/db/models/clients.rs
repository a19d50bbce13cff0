//! Database models for mailing recipients ("clients").

use crate::api::models::clients::{ClientCreate, ClientUpdate};
use crate::types::{ClientId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new client
#[derive(Debug, Clone)]
pub struct ClientCreateDBRequest {
    pub email: String,
    pub full_name: String,
    pub comment: Option<String>,
    /// Stamped with the creating user; nullable for legacy rows
    pub owner_id: Option<UserId>,
}

impl ClientCreateDBRequest {
    pub fn from_api(api: ClientCreate, owner_id: Option<UserId>) -> Self {
        Self {
            email: api.email,
            full_name: api.full_name,
            comment: api.comment,
            owner_id,
        }
    }
}

/// Database request for updating a client
#[derive(Debug, Clone, Default)]
pub struct ClientUpdateDBRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub comment: Option<String>,
    pub owner_id: Option<UserId>,
}

impl ClientUpdateDBRequest {
    /// Ownership is never changed through the public update surface.
    pub fn from_api(update: ClientUpdate) -> Self {
        Self {
            email: update.email,
            full_name: update.full_name,
            comment: update.comment,
            owner_id: None,
        }
    }
}

/// Database response for a client
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientDBResponse {
    pub id: ClientId,
    pub email: String,
    pub full_name: String,
    pub comment: Option<String>,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
