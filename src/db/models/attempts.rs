//! Database models for delivery attempts.

use crate::api::models::attempts::AttemptStatus;
use crate::types::{AttemptId, ClientId, MailingId};
use chrono::{DateTime, Utc};

/// Database request for recording a delivery attempt
#[derive(Debug, Clone)]
pub struct AttemptCreateDBRequest {
    pub mailing_id: MailingId,
    pub client_id: Option<ClientId>,
    pub status: AttemptStatus,
    pub server_response: String,
    pub content_hash: Option<String>,
}

/// Database response for a delivery attempt
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttemptDBResponse {
    pub id: AttemptId,
    pub mailing_id: MailingId,
    pub client_id: Option<ClientId>,
    pub status: AttemptStatus,
    pub server_response: String,
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}
