//! Repository for mailing campaigns.
//!
//! The recipient set lives in the `mailing_clients` join table and is
//! loaded with a second query, so `MailingDBResponse` always carries the
//! full `client_ids` list.

use crate::db::errors::{DbError, Result};
use crate::db::handlers::repository::Repository;
use crate::db::models::mailings::{MailingCreateDBRequest, MailingDBResponse, MailingRow, MailingUpdateDBRequest};
use crate::types::{ClientId, MailingId, UserId};
use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashMap;

/// Data access for the `mailings` table and its recipient join table.
pub struct Mailings<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Mailings<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    async fn client_ids(&mut self, mailing_id: MailingId) -> Result<Vec<ClientId>> {
        let ids = sqlx::query_scalar::<_, ClientId>(
            "SELECT client_id FROM mailing_clients WHERE mailing_id = ? ORDER BY client_id",
        )
        .bind(mailing_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(ids)
    }

    async fn replace_client_ids(&mut self, mailing_id: MailingId, client_ids: &[ClientId]) -> Result<()> {
        sqlx::query("DELETE FROM mailing_clients WHERE mailing_id = ?")
            .bind(mailing_id)
            .execute(&mut *self.db)
            .await?;
        for client_id in client_ids {
            sqlx::query("INSERT INTO mailing_clients (mailing_id, client_id) VALUES (?, ?)")
                .bind(mailing_id)
                .bind(client_id)
                .execute(&mut *self.db)
                .await?;
        }
        Ok(())
    }

    pub async fn count(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mailings")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    pub async fn count_active(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mailings WHERE status = 'started'")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl Repository for Mailings<'_> {
    type CreateRequest = MailingCreateDBRequest;
    type UpdateRequest = MailingUpdateDBRequest;
    type Response = MailingDBResponse;
    type Id = MailingId;
    type Filter = MailingFilter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, MailingRow>(
            "INSERT INTO mailings (start_at, end_at, status, is_active, message_id, owner_id, created_at, updated_at) \
             VALUES (?, ?, 'created', TRUE, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(request.start_at)
        .bind(request.end_at)
        .bind(request.message_id)
        .bind(request.owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        self.replace_client_ids(row.id, &request.client_ids).await?;
        let client_ids = self.client_ids(row.id).await?;
        Ok(MailingDBResponse::from_row(row, client_ids))
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let row = sqlx::query_as::<_, MailingRow>("SELECT * FROM mailings WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        match row {
            Some(row) => {
                let client_ids = self.client_ids(row.id).await?;
                Ok(Some(MailingDBResponse::from_row(row, client_ids)))
            }
            None => Ok(None),
        }
    }

    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        let mut result = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(mailing) = self.get_by_id(id).await? {
                result.insert(id, mailing);
            }
        }
        Ok(result)
    }

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let rows = match filter.owner_id {
            Some(owner_id) => {
                sqlx::query_as::<_, MailingRow>(
                    "SELECT * FROM mailings WHERE owner_id = ? ORDER BY id LIMIT ? OFFSET ?",
                )
                .bind(owner_id)
                .bind(filter.limit)
                .bind(filter.skip)
                .fetch_all(&mut *self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, MailingRow>("SELECT * FROM mailings ORDER BY id LIMIT ? OFFSET ?")
                    .bind(filter.limit)
                    .bind(filter.skip)
                    .fetch_all(&mut *self.db)
                    .await?
            }
        };

        let mut mailings = Vec::with_capacity(rows.len());
        for row in rows {
            let client_ids = self.client_ids(row.id).await?;
            mailings.push(MailingDBResponse::from_row(row, client_ids));
        }
        Ok(mailings)
    }

    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mailings WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let row = sqlx::query_as::<_, MailingRow>(
            "UPDATE mailings SET \
                 start_at = COALESCE(?, start_at), \
                 end_at = COALESCE(?, end_at), \
                 status = COALESCE(?, status), \
                 is_active = COALESCE(?, is_active), \
                 message_id = COALESCE(?, message_id), \
                 owner_id = COALESCE(?, owner_id), \
                 updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(request.start_at)
        .bind(request.end_at)
        .bind(request.status)
        .bind(request.is_active)
        .bind(request.message_id)
        .bind(request.owner_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(client_ids) = &request.client_ids {
            self.replace_client_ids(id, client_ids).await?;
        }
        let client_ids = self.client_ids(id).await?;
        Ok(MailingDBResponse::from_row(row, client_ids))
    }
}

/// Filter for listing mailings. `owner_id` restricts to one owner's rows.
#[derive(Debug, Clone, Default)]
pub struct MailingFilter {
    pub owner_id: Option<UserId>,
    pub skip: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::mailings::MailingStatus;
    use crate::db::handlers::clients::Clients;
    use crate::db::handlers::messages::Messages;
    use crate::db::models::clients::ClientCreateDBRequest;
    use crate::db::models::messages::MessageCreateDBRequest;
    use sqlx::SqlitePool;

    async fn seed_message(conn: &mut SqliteConnection) -> i64 {
        Messages::new(conn)
            .create(&MessageCreateDBRequest {
                subject: "Monthly news".to_string(),
                body: "All the things that happened.".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_client(conn: &mut SqliteConnection, email: &str) -> i64 {
        Clients::new(conn)
            .create(&ClientCreateDBRequest {
                email: email.to_string(),
                full_name: "Recipient".to_string(),
                comment: None,
                owner_id: None,
            })
            .await
            .unwrap()
            .id
    }

    fn create_request(message_id: i64, client_ids: Vec<i64>) -> MailingCreateDBRequest {
        let now = Utc::now();
        MailingCreateDBRequest {
            start_at: now,
            end_at: now + chrono::Duration::days(7),
            message_id,
            client_ids,
            owner_id: None,
        }
    }

    #[sqlx::test]
    async fn test_create_with_recipients(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let message_id = seed_message(&mut conn).await;
        let c1 = seed_client(&mut conn, "a@example.com").await;
        let c2 = seed_client(&mut conn, "b@example.com").await;

        let mut repo = Mailings::new(&mut conn);
        let mailing = repo.create(&create_request(message_id, vec![c1, c2])).await.unwrap();

        assert_eq!(mailing.status, MailingStatus::Created);
        assert!(mailing.is_active);
        assert_eq!(mailing.client_ids, vec![c1, c2]);

        let fetched = repo.get_by_id(mailing.id).await.unwrap().unwrap();
        assert_eq!(fetched.client_ids, vec![c1, c2]);
    }

    #[sqlx::test]
    async fn test_update_replaces_recipients(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let message_id = seed_message(&mut conn).await;
        let c1 = seed_client(&mut conn, "a@example.com").await;
        let c2 = seed_client(&mut conn, "b@example.com").await;

        let mut repo = Mailings::new(&mut conn);
        let mailing = repo.create(&create_request(message_id, vec![c1])).await.unwrap();

        let updated = repo
            .update(
                mailing.id,
                &MailingUpdateDBRequest {
                    status: Some(MailingStatus::Started),
                    client_ids: Some(vec![c2]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, MailingStatus::Started);
        assert_eq!(updated.client_ids, vec![c2]);

        // Fields not in the request are unchanged
        assert_eq!(updated.message_id, message_id);
    }

    #[sqlx::test]
    async fn test_invalid_message_fk_rejected(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Mailings::new(&mut conn);

        let err = repo.create(&create_request(4242, vec![])).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[sqlx::test]
    async fn test_counts(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let message_id = seed_message(&mut conn).await;

        let mut repo = Mailings::new(&mut conn);
        let m1 = repo.create(&create_request(message_id, vec![])).await.unwrap();
        repo.create(&create_request(message_id, vec![])).await.unwrap();

        // Freshly created mailings are not active until a send starts them
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.count_active().await.unwrap(), 0);

        repo.update(
            m1.id,
            &MailingUpdateDBRequest {
                status: Some(MailingStatus::Started),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.count_active().await.unwrap(), 1);
    }
}
