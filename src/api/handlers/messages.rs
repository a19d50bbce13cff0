//! Message template management.
//!
//! Messages carry no owner; any authenticated user can manage them.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::instrument;

use crate::api::models::messages::{ListMessagesQuery, MessageCreate, MessageResponse, MessageUpdate};
use crate::api::models::users::CurrentUser;
use crate::db::errors::DbError;
use crate::db::handlers::{MessageFilter, Messages, Repository};
use crate::errors::{Error, Result};
use crate::types::MessageId;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/messages",
    tag = "messages",
    params(ListMessagesQuery),
    responses((status = 200, description = "Messages", body = Vec<MessageResponse>))
)]
#[instrument(skip_all)]
pub async fn list_messages(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>> {
    let filter = MessageFilter {
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
    };
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let messages = Messages::new(&mut conn).list(&filter).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "messages",
    request_body = MessageCreate,
    responses(
        (status = 201, description = "Message created", body = MessageResponse),
        (status = 400, description = "Subject or body too short"),
    )
)]
#[instrument(skip_all)]
pub async fn create_message(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<MessageCreate>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    request.validate()?;
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let message = Messages::new(&mut conn).create(&request.into()).await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/{id}",
    tag = "messages",
    params(("id" = i64, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message", body = MessageResponse),
        (status = 404, description = "Message not found"),
    )
)]
#[instrument(skip_all, fields(message_id = id))]
pub async fn get_message(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<MessageId>,
) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let message = Messages::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or(Error::NotFound {
            resource: "message".to_string(),
            id: id.to_string(),
        })?;
    Ok(Json(message.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/messages/{id}",
    tag = "messages",
    params(("id" = i64, Path, description = "Message id")),
    request_body = MessageUpdate,
    responses(
        (status = 200, description = "Message updated", body = MessageResponse),
        (status = 400, description = "Subject or body too short"),
        (status = 404, description = "Message not found"),
    )
)]
#[instrument(skip_all, fields(message_id = id))]
pub async fn update_message(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<MessageId>,
    Json(request): Json<MessageUpdate>,
) -> Result<Json<MessageResponse>> {
    request.validate()?;
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let message = Messages::new(&mut conn).update(id, &request.into()).await?;
    Ok(Json(message.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/messages/{id}",
    tag = "messages",
    params(("id" = i64, Path, description = "Message id")),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 404, description = "Message not found"),
    )
)]
#[instrument(skip_all, fields(message_id = id))]
pub async fn delete_message(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<MessageId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let deleted = Messages::new(&mut conn).delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "message".to_string(),
            id: id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::messages::MessageResponse;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_message_crud(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;
        let auth = add_auth_headers(&user);

        let response = app
            .post("/api/v1/messages")
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"subject": "Spring offers", "body": "Fresh deals for everyone"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: MessageResponse = response.json();

        let response = app
            .put(&format!("/api/v1/messages/{}", created.id))
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"subject": "Summer offers"}))
            .await;
        response.assert_status_ok();
        let updated: MessageResponse = response.json();
        assert_eq!(updated.subject, "Summer offers");
        // Body is left alone by a partial update
        assert_eq!(updated.body, "Fresh deals for everyone");

        app.delete(&format!("/api/v1/messages/{}", created.id))
            .add_header(auth.0.clone(), auth.1.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        app.get(&format!("/api/v1/messages/{}", created.id))
            .add_header(auth.0, auth.1)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_short_subject_and_body_rejected(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;
        let auth = add_auth_headers(&user);

        let response = app
            .post("/api/v1/messages")
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"subject": "Hey", "body": "Fresh deals for everyone"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("Subject must be at least"));

        let response = app
            .post("/api/v1/messages")
            .add_header(auth.0, auth.1)
            .json(&json!({"subject": "Spring offers", "body": "short"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
