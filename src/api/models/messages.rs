//! API models for message templates.

use crate::api::models::pagination::Pagination;
use crate::db::models::messages::MessageDBResponse;
use crate::errors::Error;
use crate::types::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Minimum subject length accepted by create/update.
pub const MIN_SUBJECT_LENGTH: usize = 5;

/// Minimum body length accepted by create/update.
pub const MIN_BODY_LENGTH: usize = 10;

fn validate_subject(subject: &str) -> Result<(), Error> {
    if subject.chars().count() < MIN_SUBJECT_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Subject must be at least {MIN_SUBJECT_LENGTH} characters long"),
        });
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<(), Error> {
    if body.chars().count() < MIN_BODY_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Body must be at least {MIN_BODY_LENGTH} characters long"),
        });
    }
    Ok(())
}

/// Request body for creating a message template.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MessageCreate {
    pub subject: String,
    pub body: String,
}

impl MessageCreate {
    /// Form-level validation; nothing is persisted on failure.
    pub fn validate(&self) -> Result<(), Error> {
        validate_subject(&self.subject)?;
        validate_body(&self.body)
    }
}

/// Request body for updating a message template.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MessageUpdate {
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl MessageUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(subject) = &self.subject {
            validate_subject(subject)?;
        }
        if let Some(body) = &self.body {
            validate_body(body)?;
        }
        Ok(())
    }
}

/// Public representation of a message template.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: MessageId,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MessageDBResponse> for MessageResponse {
    fn from(db: MessageDBResponse) -> Self {
        Self {
            id: db.id,
            subject: db.subject,
            body: db.body,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing message templates.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListMessagesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_validation() {
        let ok = MessageCreate {
            subject: "Hello there".to_string(),
            body: "A body long enough".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short_subject = MessageCreate {
            subject: "Hi".to_string(),
            body: "A body long enough".to_string(),
        };
        assert!(short_subject.validate().is_err());

        let short_body = MessageCreate {
            subject: "Hello there".to_string(),
            body: "short".to_string(),
        };
        assert!(short_body.validate().is_err());
    }

    #[test]
    fn test_update_validation_skips_absent_fields() {
        let empty = MessageUpdate::default();
        assert!(empty.validate().is_ok());

        let bad = MessageUpdate {
            subject: Some("Hi".to_string()),
            body: None,
        };
        assert!(bad.validate().is_err());
    }
}
