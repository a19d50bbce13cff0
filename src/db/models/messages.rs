//! Database models for message templates.

use crate::api::models::messages::{MessageCreate, MessageUpdate};
use crate::types::MessageId;
use chrono::{DateTime, Utc};

/// Database request for creating a new message template
#[derive(Debug, Clone)]
pub struct MessageCreateDBRequest {
    pub subject: String,
    pub body: String,
}

impl From<MessageCreate> for MessageCreateDBRequest {
    fn from(api: MessageCreate) -> Self {
        Self {
            subject: api.subject,
            body: api.body,
        }
    }
}

/// Database request for updating a message template
#[derive(Debug, Clone, Default)]
pub struct MessageUpdateDBRequest {
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl From<MessageUpdate> for MessageUpdateDBRequest {
    fn from(update: MessageUpdate) -> Self {
        Self {
            subject: update.subject,
            body: update.body,
        }
    }
}

/// Database response for a message template
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageDBResponse {
    pub id: MessageId,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
