//! Database models for mailing campaigns.

use crate::api::models::mailings::{MailingCreate, MailingStatus, MailingUpdate};
use crate::types::{ClientId, MailingId, MessageId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new mailing
#[derive(Debug, Clone)]
pub struct MailingCreateDBRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub message_id: MessageId,
    pub client_ids: Vec<ClientId>,
    pub owner_id: Option<UserId>,
}

impl MailingCreateDBRequest {
    pub fn from_api(api: MailingCreate, owner_id: Option<UserId>) -> Self {
        Self {
            start_at: api.start_at,
            end_at: api.end_at,
            message_id: api.message_id,
            client_ids: api.client_ids,
            owner_id,
        }
    }
}

/// Database request for updating a mailing.
///
/// `client_ids: Some(_)` replaces the entire recipient set.
#[derive(Debug, Clone, Default)]
pub struct MailingUpdateDBRequest {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub status: Option<MailingStatus>,
    pub is_active: Option<bool>,
    pub message_id: Option<MessageId>,
    pub client_ids: Option<Vec<ClientId>>,
    pub owner_id: Option<UserId>,
}

impl MailingUpdateDBRequest {
    /// Ownership is never changed through the public update surface.
    pub fn from_api(update: MailingUpdate) -> Self {
        Self {
            start_at: update.start_at,
            end_at: update.end_at,
            status: update.status,
            is_active: update.is_active,
            message_id: update.message_id,
            client_ids: update.client_ids,
            owner_id: None,
        }
    }
}

/// Raw mailing row, without the recipient set.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MailingRow {
    pub id: MailingId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: MailingStatus,
    pub is_active: bool,
    pub message_id: MessageId,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database response for a mailing, with its recipient set attached.
#[derive(Debug, Clone)]
pub struct MailingDBResponse {
    pub id: MailingId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: MailingStatus,
    pub is_active: bool,
    pub message_id: MessageId,
    pub owner_id: Option<UserId>,
    pub client_ids: Vec<ClientId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MailingDBResponse {
    pub fn from_row(row: MailingRow, client_ids: Vec<ClientId>) -> Self {
        Self {
            id: row.id,
            start_at: row.start_at,
            end_at: row.end_at,
            status: row.status,
            is_active: row.is_active,
            message_id: row.message_id,
            owner_id: row.owner_id,
            client_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
