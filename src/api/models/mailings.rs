//! API models for mailing campaigns.

use crate::api::models::pagination::Pagination;
use crate::db::models::mailings::MailingDBResponse;
use crate::types::{ClientId, MailingId, MessageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Lifecycle status of a mailing. Closed enumeration, default `created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MailingStatus {
    Created,
    Started,
    Completed,
}

/// Request body for creating a mailing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MailingCreate {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub message_id: MessageId,
    /// Recipient set for the campaign
    #[serde(default)]
    pub client_ids: Vec<ClientId>,
}

/// Request body for updating a mailing. Omitted fields are left unchanged;
/// `client_ids` replaces the entire recipient set when present.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MailingUpdate {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub status: Option<MailingStatus>,
    pub is_active: Option<bool>,
    pub message_id: Option<MessageId>,
    pub client_ids: Option<Vec<ClientId>>,
}

/// Public representation of a mailing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MailingResponse {
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

impl From<MailingDBResponse> for MailingResponse {
    fn from(db: MailingDBResponse) -> Self {
        Self {
            id: db.id,
            start_at: db.start_at,
            end_at: db.end_at,
            status: db.status,
            is_active: db.is_active,
            message_id: db.message_id,
            owner_id: db.owner_id,
            client_ids: db.client_ids,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing mailings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListMailingsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// Result of the manual-send endpoint: the human-readable outcome line.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendResultResponse {
    pub result: String,
}

/// Aggregate attempt statistics for a mailing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MailingStatsResponse {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    pub last_attempt: Option<DateTime<Utc>>,
}
