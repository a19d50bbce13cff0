//! API models for mailing recipients ("clients").

use crate::api::models::pagination::Pagination;
use crate::db::models::clients::ClientDBResponse;
use crate::types::{ClientId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Request body for creating a client.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClientCreate {
    pub email: String,
    pub full_name: String,
    pub comment: Option<String>,
}

/// Request body for updating a client. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ClientUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub comment: Option<String>,
}

/// Public representation of a client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientResponse {
    pub id: ClientId,
    pub email: String,
    pub full_name: String,
    pub comment: Option<String>,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClientDBResponse> for ClientResponse {
    fn from(db: ClientDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            full_name: db.full_name,
            comment: db.comment,
            owner_id: db.owner_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing clients.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListClientsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}
