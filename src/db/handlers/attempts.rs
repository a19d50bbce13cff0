//! Data access for delivery attempt records.
//!
//! Attempts are append-only, so this handler doesn't implement the full
//! `Repository` trait: there is no update or delete path.

use crate::api::models::attempts::AttemptStatus;
use crate::api::models::mailings::MailingStatsResponse;
use crate::db::errors::Result;
use crate::db::models::attempts::{AttemptCreateDBRequest, AttemptDBResponse};
use crate::types::{ClientId, MailingId};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

/// Data access for the `mailing_attempts` table.
pub struct Attempts<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Attempts<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    pub async fn create(&mut self, request: &AttemptCreateDBRequest) -> Result<AttemptDBResponse> {
        let attempt = sqlx::query_as::<_, AttemptDBResponse>(
            "INSERT INTO mailing_attempts (mailing_id, client_id, status, server_response, content_hash, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(request.mailing_id)
        .bind(request.client_id)
        .bind(request.status)
        .bind(&request.server_response)
        .bind(&request.content_hash)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;
        Ok(attempt)
    }

    /// All attempts for a mailing, newest first.
    pub async fn list_for_mailing(&mut self, mailing_id: MailingId) -> Result<Vec<AttemptDBResponse>> {
        let attempts = sqlx::query_as::<_, AttemptDBResponse>(
            "SELECT * FROM mailing_attempts WHERE mailing_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(mailing_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(attempts)
    }

    /// Most recent attempt for one recipient of a mailing since `since`.
    pub async fn latest_for_client_since(
        &mut self,
        mailing_id: MailingId,
        client_id: ClientId,
        since: DateTime<Utc>,
    ) -> Result<Option<AttemptDBResponse>> {
        let attempt = sqlx::query_as::<_, AttemptDBResponse>(
            "SELECT * FROM mailing_attempts \
             WHERE mailing_id = ? AND client_id = ? AND created_at >= ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(mailing_id)
        .bind(client_id)
        .bind(since)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(attempt)
    }

    /// Most recent attempt for a mailing since `since`, regardless of recipient.
    pub async fn latest_since(&mut self, mailing_id: MailingId, since: DateTime<Utc>) -> Result<Option<AttemptDBResponse>> {
        let attempt = sqlx::query_as::<_, AttemptDBResponse>(
            "SELECT * FROM mailing_attempts \
             WHERE mailing_id = ? AND created_at >= ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(mailing_id)
        .bind(since)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(attempt)
    }

    /// Total number of attempts recorded for a mailing.
    pub async fn count_for_mailing(&mut self, mailing_id: MailingId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mailing_attempts WHERE mailing_id = ?")
            .bind(mailing_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    /// Aggregate attempt statistics for a mailing.
    pub async fn stats(&mut self, mailing_id: MailingId) -> Result<MailingStatsResponse> {
        let (total, successful, failed) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT \
                 COUNT(*), \
                 COUNT(*) FILTER (WHERE status = 'success'), \
                 COUNT(*) FILTER (WHERE status = 'failed') \
             FROM mailing_attempts WHERE mailing_id = ?",
        )
        .bind(mailing_id)
        .fetch_one(&mut *self.db)
        .await?;

        let last_attempt = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM mailing_attempts WHERE mailing_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(mailing_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(MailingStatsResponse {
            total,
            successful,
            failed,
            last_attempt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::mailings::Mailings;
    use crate::db::handlers::messages::Messages;
    use crate::db::handlers::repository::Repository;
    use crate::db::models::mailings::MailingCreateDBRequest;
    use crate::db::models::messages::MessageCreateDBRequest;
    use sqlx::SqlitePool;

    async fn seed_mailing(conn: &mut SqliteConnection) -> MailingId {
        let message = Messages::new(conn)
            .create(&MessageCreateDBRequest {
                subject: "Test subject".to_string(),
                body: "A body long enough.".to_string(),
            })
            .await
            .unwrap();
        let now = Utc::now();
        Mailings::new(conn)
            .create(&MailingCreateDBRequest {
                start_at: now,
                end_at: now + chrono::Duration::days(1),
                message_id: message.id,
                client_ids: vec![],
                owner_id: None,
            })
            .await
            .unwrap()
            .id
    }

    fn attempt(mailing_id: MailingId, status: AttemptStatus) -> AttemptCreateDBRequest {
        AttemptCreateDBRequest {
            mailing_id,
            client_id: None,
            status,
            server_response: "test".to_string(),
            content_hash: None,
        }
    }

    #[sqlx::test]
    async fn test_create_and_list_newest_first(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mailing_id = seed_mailing(&mut conn).await;
        let mut repo = Attempts::new(&mut conn);

        let first = repo.create(&attempt(mailing_id, AttemptStatus::Success)).await.unwrap();
        let second = repo.create(&attempt(mailing_id, AttemptStatus::Failed)).await.unwrap();

        let listed = repo.list_for_mailing(mailing_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[sqlx::test]
    async fn test_stats(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mailing_id = seed_mailing(&mut conn).await;
        let mut repo = Attempts::new(&mut conn);

        // No attempts yet
        let empty = repo.stats(mailing_id).await.unwrap();
        assert_eq!(empty.total, 0);
        assert!(empty.last_attempt.is_none());

        repo.create(&attempt(mailing_id, AttemptStatus::Success)).await.unwrap();
        repo.create(&attempt(mailing_id, AttemptStatus::Success)).await.unwrap();
        repo.create(&attempt(mailing_id, AttemptStatus::Failed)).await.unwrap();

        let stats = repo.stats(mailing_id).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert!(stats.last_attempt.is_some());
    }

    #[sqlx::test]
    async fn test_latest_since_windows(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mailing_id = seed_mailing(&mut conn).await;
        let mut repo = Attempts::new(&mut conn);

        repo.create(&attempt(mailing_id, AttemptStatus::Success)).await.unwrap();

        let recent = repo
            .latest_since(mailing_id, Utc::now() - chrono::Duration::minutes(30))
            .await
            .unwrap();
        assert!(recent.is_some());

        // A window that starts in the future matches nothing
        let future = repo
            .latest_since(mailing_id, Utc::now() + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert!(future.is_none());
    }

    #[sqlx::test]
    async fn test_latest_for_client_since(pool: SqlitePool) {
        use crate::db::handlers::clients::Clients;
        use crate::db::models::clients::ClientCreateDBRequest;

        let mut conn = pool.acquire().await.unwrap();
        let mailing_id = seed_mailing(&mut conn).await;
        let client = Clients::new(&mut conn)
            .create(&ClientCreateDBRequest {
                email: "r@example.com".to_string(),
                full_name: "Recipient".to_string(),
                comment: None,
                owner_id: None,
            })
            .await
            .unwrap();

        let mut repo = Attempts::new(&mut conn);
        repo.create(&AttemptCreateDBRequest {
            mailing_id,
            client_id: Some(client.id),
            status: AttemptStatus::Success,
            server_response: "ok".to_string(),
            content_hash: Some("abc123".to_string()),
        })
        .await
        .unwrap();

        let since = Utc::now() - chrono::Duration::hours(24);
        let found = repo
            .latest_for_client_since(mailing_id, client.id, since)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.content_hash.as_deref(), Some("abc123"));

        // A different client has no attempts
        let other = repo.latest_for_client_since(mailing_id, client.id + 1, since).await.unwrap();
        assert!(other.is_none());
    }
}
