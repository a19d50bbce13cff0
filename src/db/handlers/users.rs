//! Repository for user accounts.

use crate::api::models::users::ManagerOverview;
use crate::db::errors::{DbError, Result};
use crate::db::handlers::repository::Repository;
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest};
use crate::types::UserId;
use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashMap;

/// Data access for the `users` table.
pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Look up a user by email address.
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    /// Account totals per role class for the manager overview.
    pub async fn role_counts(&mut self) -> Result<ManagerOverview> {
        let (managers, users, superusers) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT \
                 COUNT(*) FILTER (WHERE is_staff AND NOT is_superuser), \
                 COUNT(*) FILTER (WHERE NOT is_staff AND NOT is_superuser), \
                 COUNT(*) FILTER (WHERE is_superuser) \
             FROM users",
        )
        .fetch_one(&mut *self.db)
        .await?;

        Ok(ManagerOverview {
            managers,
            users,
            superusers,
        })
    }
}

#[async_trait::async_trait]
impl Repository for Users<'_> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, UserDBResponse>(
            "INSERT INTO users (username, email, password_hash, is_staff, is_superuser, email_verified, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.is_staff)
        .bind(request.is_superuser)
        .bind(request.email_verified)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(user)
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut builder = sqlx::QueryBuilder::new("SELECT * FROM users WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in &ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let users = builder
            .build_query_as::<UserDBResponse>()
            .fetch_all(&mut *self.db)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(users)
    }

    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            "UPDATE users SET \
                 is_staff = COALESCE(?, is_staff), \
                 is_superuser = COALESCE(?, is_superuser), \
                 is_blocked = COALESCE(?, is_blocked), \
                 email_verified = COALESCE(?, email_verified), \
                 password_hash = COALESCE(?, password_hash), \
                 updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(request.is_staff)
        .bind(request.is_superuser)
        .bind(request.is_blocked)
        .bind(request.email_verified)
        .bind(&request.password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(user)
    }
}

/// Filter for listing users.
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}
