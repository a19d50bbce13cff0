//! Repository for message templates.

use crate::db::errors::{DbError, Result};
use crate::db::handlers::repository::Repository;
use crate::db::models::messages::{MessageCreateDBRequest, MessageDBResponse, MessageUpdateDBRequest};
use crate::types::MessageId;
use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashMap;

/// Data access for the `messages` table.
pub struct Messages<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Messages<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Repository for Messages<'_> {
    type CreateRequest = MessageCreateDBRequest;
    type UpdateRequest = MessageUpdateDBRequest;
    type Response = MessageDBResponse;
    type Id = MessageId;
    type Filter = MessageFilter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let message = sqlx::query_as::<_, MessageDBResponse>(
            "INSERT INTO messages (subject, body, created_at, updated_at) \
             VALUES (?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(&request.subject)
        .bind(&request.body)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(message)
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let message = sqlx::query_as::<_, MessageDBResponse>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(message)
    }

    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut builder = sqlx::QueryBuilder::new("SELECT * FROM messages WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in &ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let messages = builder
            .build_query_as::<MessageDBResponse>()
            .fetch_all(&mut *self.db)
            .await?;
        Ok(messages.into_iter().map(|m| (m.id, m)).collect())
    }

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let messages = sqlx::query_as::<_, MessageDBResponse>("SELECT * FROM messages ORDER BY id LIMIT ? OFFSET ?")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(messages)
    }

    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let message = sqlx::query_as::<_, MessageDBResponse>(
            "UPDATE messages SET \
                 subject = COALESCE(?, subject), \
                 body = COALESCE(?, body), \
                 updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(&request.subject)
        .bind(&request.body)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(message)
    }
}

/// Filter for listing message templates.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub skip: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    #[sqlx::test]
    async fn test_message_crud(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Messages::new(&mut conn);

        let created = repo
            .create(&MessageCreateDBRequest {
                subject: "Welcome aboard".to_string(),
                body: "Thanks for signing up with us.".to_string(),
            })
            .await
            .unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.subject, "Welcome aboard");

        let updated = repo
            .update(
                created.id,
                &MessageUpdateDBRequest {
                    body: Some("A different body entirely.".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.subject, "Welcome aboard");
        assert_eq!(updated.body, "A different body entirely.");

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn test_list_pagination(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Messages::new(&mut conn);

        for i in 0..5 {
            repo.create(&MessageCreateDBRequest {
                subject: format!("Subject number {i}"),
                body: "A body long enough to pass validation".to_string(),
            })
            .await
            .unwrap();
        }

        let page = repo.list(&MessageFilter { skip: 2, limit: 2 }).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].subject, "Subject number 2");
    }
}
