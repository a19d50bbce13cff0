//! Repository for mailing recipients ("clients").

use crate::db::errors::{DbError, Result};
use crate::db::handlers::repository::Repository;
use crate::db::models::clients::{ClientCreateDBRequest, ClientDBResponse, ClientUpdateDBRequest};
use crate::types::{ClientId, MailingId, UserId};
use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashMap;

/// Data access for the `clients` table.
pub struct Clients<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Clients<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Recipient set of a mailing, in id order.
    pub async fn list_for_mailing(&mut self, mailing_id: MailingId) -> Result<Vec<ClientDBResponse>> {
        let clients = sqlx::query_as::<_, ClientDBResponse>(
            "SELECT c.* FROM clients c \
             INNER JOIN mailing_clients mc ON mc.client_id = c.id \
             WHERE mc.mailing_id = ? \
             ORDER BY c.id",
        )
        .bind(mailing_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(clients)
    }

    pub async fn count(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl Repository for Clients<'_> {
    type CreateRequest = ClientCreateDBRequest;
    type UpdateRequest = ClientUpdateDBRequest;
    type Response = ClientDBResponse;
    type Id = ClientId;
    type Filter = ClientFilter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let client = sqlx::query_as::<_, ClientDBResponse>(
            "INSERT INTO clients (email, full_name, comment, owner_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(&request.comment)
        .bind(request.owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(client)
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let client = sqlx::query_as::<_, ClientDBResponse>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(client)
    }

    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut builder = sqlx::QueryBuilder::new("SELECT * FROM clients WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in &ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let clients = builder
            .build_query_as::<ClientDBResponse>()
            .fetch_all(&mut *self.db)
            .await?;
        Ok(clients.into_iter().map(|c| (c.id, c)).collect())
    }

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let clients = match filter.owner_id {
            Some(owner_id) => {
                sqlx::query_as::<_, ClientDBResponse>(
                    "SELECT * FROM clients WHERE owner_id = ? ORDER BY id LIMIT ? OFFSET ?",
                )
                .bind(owner_id)
                .bind(filter.limit)
                .bind(filter.skip)
                .fetch_all(&mut *self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, ClientDBResponse>("SELECT * FROM clients ORDER BY id LIMIT ? OFFSET ?")
                    .bind(filter.limit)
                    .bind(filter.skip)
                    .fetch_all(&mut *self.db)
                    .await?
            }
        };
        Ok(clients)
    }

    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let client = sqlx::query_as::<_, ClientDBResponse>(
            "UPDATE clients SET \
                 email = COALESCE(?, email), \
                 full_name = COALESCE(?, full_name), \
                 comment = COALESCE(?, comment), \
                 owner_id = COALESCE(?, owner_id), \
                 updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(&request.comment)
        .bind(request.owner_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(client)
    }
}

/// Filter for listing clients. `owner_id` restricts to one owner's rows.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub owner_id: Option<UserId>,
    pub skip: i64,
    pub limit: i64,
}
