//! Mailing campaign management and sending.
//!
//! Regular users see and manage their own mailings. Staff can read
//! everything and can deactivate any mailing; writing someone else's
//! mailing takes a superuser.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, instrument};

use crate::api::models::attempts::AttemptResponse;
use crate::api::models::mailings::{
    ListMailingsQuery, MailingCreate, MailingResponse, MailingStatsResponse, MailingUpdate,
    SendResultResponse,
};
use crate::api::models::users::CurrentUser;
use crate::auth::{require_owner, require_staff};
use crate::db::errors::DbError;
use crate::db::handlers::{Attempts, MailingFilter, Mailings, Repository};
use crate::db::models::mailings::{MailingDBResponse, MailingCreateDBRequest, MailingUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::sender;
use crate::types::MailingId;
use crate::AppState;

async fn load_mailing(state: &AppState, id: MailingId) -> Result<MailingDBResponse> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    Mailings::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or(Error::NotFound {
            resource: "mailing".to_string(),
            id: id.to_string(),
        })
}

fn check_read(user: &CurrentUser, mailing: &MailingDBResponse) -> Result<()> {
    if user.is_staff || user.is_superuser {
        return Ok(());
    }
    require_owner(user, mailing.owner_id, "view", "this mailing")
}

#[utoipa::path(
    get,
    path = "/api/v1/mailings",
    tag = "mailings",
    params(ListMailingsQuery),
    responses((status = 200, description = "Mailings", body = Vec<MailingResponse>))
)]
#[instrument(skip_all)]
pub async fn list_mailings(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListMailingsQuery>,
) -> Result<Json<Vec<MailingResponse>>> {
    let owner_id = if user.is_staff || user.is_superuser {
        None
    } else {
        Some(user.id)
    };
    let filter = MailingFilter {
        owner_id,
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
    };
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mailings = Mailings::new(&mut conn).list(&filter).await?;
    Ok(Json(mailings.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/mailings",
    tag = "mailings",
    request_body = MailingCreate,
    responses(
        (status = 201, description = "Mailing created", body = MailingResponse),
        (status = 400, description = "Unknown message or client id"),
    )
)]
#[instrument(skip_all)]
pub async fn create_mailing(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<MailingCreate>,
) -> Result<(StatusCode, Json<MailingResponse>)> {
    if request.end_at <= request.start_at {
        return Err(Error::BadRequest {
            message: "Mailing must end after it starts".to_string(),
        });
    }
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mailing = Mailings::new(&mut conn)
        .create(&MailingCreateDBRequest::from_api(request, Some(user.id)))
        .await?;
    Ok((StatusCode::CREATED, Json(mailing.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/mailings/{id}",
    tag = "mailings",
    params(("id" = i64, Path, description = "Mailing id")),
    responses(
        (status = 200, description = "Mailing", body = MailingResponse),
        (status = 404, description = "Mailing not found"),
    )
)]
#[instrument(skip_all, fields(mailing_id = id))]
pub async fn get_mailing(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<MailingId>,
) -> Result<Json<MailingResponse>> {
    let mailing = load_mailing(&state, id).await?;
    check_read(&user, &mailing)?;
    Ok(Json(mailing.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/mailings/{id}",
    tag = "mailings",
    params(("id" = i64, Path, description = "Mailing id")),
    request_body = MailingUpdate,
    responses(
        (status = 200, description = "Mailing updated", body = MailingResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Mailing not found"),
    )
)]
#[instrument(skip_all, fields(mailing_id = id))]
pub async fn update_mailing(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<MailingId>,
    Json(request): Json<MailingUpdate>,
) -> Result<Json<MailingResponse>> {
    let existing = load_mailing(&state, id).await?;
    require_owner(&user, existing.owner_id, "update", "this mailing")?;
    if let (Some(start_at), Some(end_at)) = (request.start_at, request.end_at) {
        if end_at <= start_at {
            return Err(Error::BadRequest {
                message: "Mailing must end after it starts".to_string(),
            });
        }
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let updated = Mailings::new(&mut conn)
        .update(id, &MailingUpdateDBRequest::from_api(request))
        .await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/mailings/{id}",
    tag = "mailings",
    params(("id" = i64, Path, description = "Mailing id")),
    responses(
        (status = 204, description = "Mailing deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Mailing not found"),
    )
)]
#[instrument(skip_all, fields(mailing_id = id))]
pub async fn delete_mailing(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<MailingId>,
) -> Result<StatusCode> {
    let existing = load_mailing(&state, id).await?;
    require_owner(&user, existing.owner_id, "delete", "this mailing")?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    Mailings::new(&mut conn).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Trigger a mailing immediately.
#[utoipa::path(
    post,
    path = "/api/v1/mailings/{id}/send",
    tag = "mailings",
    params(("id" = i64, Path, description = "Mailing id")),
    responses(
        (status = 200, description = "Send result", body = SendResultResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Mailing not found"),
    )
)]
#[instrument(skip_all, fields(mailing_id = id))]
pub async fn send_mailing(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<MailingId>,
) -> Result<Json<SendResultResponse>> {
    let mailing = load_mailing(&state, id).await?;
    if !(user.is_staff || user.is_superuser) {
        require_owner(&user, mailing.owner_id, "send", "this mailing")?;
    }

    let result = sender::send_mailing_manual(&state, id).await?;
    Ok(Json(SendResultResponse { result }))
}

/// Flip a mailing's active flag. Staff only.
#[utoipa::path(
    post,
    path = "/api/v1/mailings/{id}/toggle",
    tag = "mailings",
    params(("id" = i64, Path, description = "Mailing id")),
    responses(
        (status = 200, description = "Mailing toggled", body = MailingResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Mailing not found"),
    )
)]
#[instrument(skip_all, fields(mailing_id = id))]
pub async fn toggle_mailing(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<MailingId>,
) -> Result<Json<MailingResponse>> {
    require_staff(&user, "toggle", "mailings")?;
    let existing = load_mailing(&state, id).await?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let updated = Mailings::new(&mut conn)
        .update(
            id,
            &MailingUpdateDBRequest {
                is_active: Some(!existing.is_active),
                ..Default::default()
            },
        )
        .await?;
    info!(
        mailing_id = id,
        is_active = updated.is_active,
        "mailing toggled"
    );
    Ok(Json(updated.into()))
}

/// Delivery attempt log for a mailing, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/mailings/{id}/attempts",
    tag = "mailings",
    params(("id" = i64, Path, description = "Mailing id")),
    responses(
        (status = 200, description = "Attempts", body = Vec<AttemptResponse>),
        (status = 404, description = "Mailing not found"),
    )
)]
#[instrument(skip_all, fields(mailing_id = id))]
pub async fn list_attempts(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<MailingId>,
) -> Result<Json<Vec<AttemptResponse>>> {
    let mailing = load_mailing(&state, id).await?;
    check_read(&user, &mailing)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let attempts = Attempts::new(&mut conn).list_for_mailing(id).await?;
    Ok(Json(attempts.into_iter().map(Into::into).collect()))
}

/// Aggregate attempt statistics for a mailing.
#[utoipa::path(
    get,
    path = "/api/v1/mailings/{id}/stats",
    tag = "mailings",
    params(("id" = i64, Path, description = "Mailing id")),
    responses(
        (status = 200, description = "Statistics", body = MailingStatsResponse),
        (status = 404, description = "Mailing not found"),
    )
)]
#[instrument(skip_all, fields(mailing_id = id))]
pub async fn mailing_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<MailingId>,
) -> Result<Json<MailingStatsResponse>> {
    let mailing = load_mailing(&state, id).await?;
    check_read(&user, &mailing)?;

    let stats = sender::mailing_stats(&state, id).await?;
    Ok(Json(stats))
}
