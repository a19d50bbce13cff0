//! User administration.
//!
//! Listing and blocking are staff operations; role changes take a
//! superuser. Superusers cannot be blocked, and nobody can block or
//! demote themselves.

use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::{info, instrument};

use crate::api::models::users::{CurrentUser, ListUsersQuery, ManagerOverview, UserResponse};
use crate::auth::{require_staff, require_superuser};
use crate::db::errors::DbError;
use crate::db::handlers::{Repository, UserFilter, Users};
use crate::db::models::users::{UserDBResponse, UserUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::sender;
use crate::types::UserId;
use crate::AppState;

async fn load_user(state: &AppState, id: UserId) -> Result<UserDBResponse> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    Users::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or(Error::NotFound {
            resource: "user".to_string(),
            id: id.to_string(),
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users", body = Vec<UserResponse>),
        (status = 403, description = "Staff only"),
    )
)]
#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    require_staff(&user, "list", "users")?;
    let filter = UserFilter {
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
    };
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let users = Users::new(&mut conn).list(&filter).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// The current user's own profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses((status = 200, description = "Current user", body = UserResponse))
)]
#[instrument(skip_all)]
pub async fn get_me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<UserResponse>> {
    let loaded = load_user(&state, user.id).await?;
    Ok(Json(loaded.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found"),
    )
)]
#[instrument(skip_all, fields(user_id = id))]
pub async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    if id != user.id {
        require_staff(&user, "view", "other users")?;
    }
    let loaded = load_user(&state, id).await?;
    Ok(Json(loaded.into()))
}

async fn set_blocked(state: &AppState, actor: &CurrentUser, id: UserId, blocked: bool) -> Result<UserResponse> {
    let verb = if blocked { "block" } else { "unblock" };
    require_staff(actor, verb, "users")?;
    if id == actor.id {
        return Err(Error::BadRequest {
            message: "You cannot block your own account".to_string(),
        });
    }
    let target = load_user(state, id).await?;
    if target.is_superuser {
        return Err(Error::Forbidden {
            action: verb.to_string(),
            resource: "a superuser".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let updated = Users::new(&mut conn)
        .update(
            id,
            &UserUpdateDBRequest {
                is_blocked: Some(blocked),
                ..Default::default()
            },
        )
        .await?;
    info!(user_id = id, blocked, "user block flag changed");
    Ok(updated.into())
}

/// Block a user. A blocked user's next request is rejected.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/block",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User blocked", body = UserResponse),
        (status = 403, description = "Staff only, and superusers cannot be blocked"),
        (status = 404, description = "User not found"),
    )
)]
#[instrument(skip_all, fields(user_id = id))]
pub async fn block_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    Ok(Json(set_blocked(&state, &user, id, true).await?))
}

/// Unblock a user.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/unblock",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User unblocked", body = UserResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found"),
    )
)]
#[instrument(skip_all, fields(user_id = id))]
pub async fn unblock_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    Ok(Json(set_blocked(&state, &user, id, false).await?))
}

async fn set_staff(state: &AppState, actor: &CurrentUser, id: UserId, is_staff: bool) -> Result<UserResponse> {
    let verb = if is_staff { "promote" } else { "demote" };
    require_superuser(actor, verb, "users")?;
    if id == actor.id && !is_staff {
        return Err(Error::BadRequest {
            message: "You cannot demote your own account".to_string(),
        });
    }
    let target = load_user(state, id).await?;
    if target.is_superuser && !is_staff {
        return Err(Error::Forbidden {
            action: verb.to_string(),
            resource: "a superuser".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let updated = Users::new(&mut conn)
        .update(
            id,
            &UserUpdateDBRequest {
                is_staff: Some(is_staff),
                ..Default::default()
            },
        )
        .await?;
    info!(user_id = id, is_staff, "user staff flag changed");
    Ok(updated.into())
}

/// Grant the staff role. Superuser only.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/promote",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User promoted", body = UserResponse),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "User not found"),
    )
)]
#[instrument(skip_all, fields(user_id = id))]
pub async fn promote_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    Ok(Json(set_staff(&state, &user, id, true).await?))
}

/// Revoke the staff role. Superuser only.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/demote",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User demoted", body = UserResponse),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "User not found"),
    )
)]
#[instrument(skip_all, fields(user_id = id))]
pub async fn demote_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    Ok(Json(set_staff(&state, &user, id, false).await?))
}

/// Role counters, cached briefly.
#[utoipa::path(
    get,
    path = "/api/v1/users/overview",
    tag = "users",
    responses(
        (status = 200, description = "Role counters", body = ManagerOverview),
        (status = 403, description = "Staff only"),
    )
)]
#[instrument(skip_all)]
pub async fn manager_overview(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ManagerOverview>> {
    require_staff(&user, "view", "the user overview")?;
    Ok(Json(sender::manager_overview(&state).await?))
}
