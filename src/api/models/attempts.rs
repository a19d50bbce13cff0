//! API models for delivery attempts.

use crate::db::models::attempts::AttemptDBResponse;
use crate::types::{AttemptId, ClientId, MailingId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Failed,
}

/// Public representation of a delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttemptResponse {
    pub id: AttemptId,
    pub mailing_id: MailingId,
    pub client_id: Option<ClientId>,
    pub status: AttemptStatus,
    pub server_response: String,
    pub created_at: DateTime<Utc>,
}

impl From<AttemptDBResponse> for AttemptResponse {
    fn from(db: AttemptDBResponse) -> Self {
        Self {
            id: db.id,
            mailing_id: db.mailing_id,
            client_id: db.client_id,
            status: db.status,
            server_response: db.server_response,
            created_at: db.created_at,
        }
    }
}
