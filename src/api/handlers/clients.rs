//! Client (recipient) management.
//!
//! Regular users see and manage only their own clients. Staff can read
//! everything; writing someone else's client takes a superuser.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::instrument;

use crate::api::models::clients::{ClientCreate, ClientResponse, ClientUpdate, ListClientsQuery};
use crate::api::models::users::CurrentUser;
use crate::auth::require_owner;
use crate::db::errors::DbError;
use crate::db::handlers::{ClientFilter, Clients, Repository};
use crate::db::models::clients::{ClientCreateDBRequest, ClientUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::ClientId;
use crate::AppState;

/// List clients. Staff see all; everyone else sees their own.
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "clients",
    params(ListClientsQuery),
    responses((status = 200, description = "Clients", body = Vec<ClientResponse>))
)]
#[instrument(skip_all)]
pub async fn list_clients(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<Vec<ClientResponse>>> {
    let owner_id = if user.is_staff || user.is_superuser {
        None
    } else {
        Some(user.id)
    };
    let filter = ClientFilter {
        owner_id,
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
    };
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let clients = Clients::new(&mut conn).list(&filter).await?;
    Ok(Json(clients.into_iter().map(Into::into).collect()))
}

/// Create a client owned by the current user.
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    tag = "clients",
    request_body = ClientCreate,
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 409, description = "Email already registered"),
    )
)]
#[instrument(skip_all)]
pub async fn create_client(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ClientCreate>,
) -> Result<(StatusCode, Json<ClientResponse>)> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let client = Clients::new(&mut conn)
        .create(&ClientCreateDBRequest::from_api(request, Some(user.id)))
        .await?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

/// Fetch a single client.
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    tag = "clients",
    params(("id" = i64, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = ClientResponse),
        (status = 404, description = "Client not found"),
    )
)]
#[instrument(skip_all, fields(client_id = id))]
pub async fn get_client(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ClientId>,
) -> Result<Json<ClientResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let client = Clients::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or(Error::NotFound {
            resource: "client".to_string(),
            id: id.to_string(),
        })?;
    if !(user.is_staff || user.is_superuser) {
        require_owner(&user, client.owner_id, "view", "this client")?;
    }
    Ok(Json(client.into()))
}

/// Update a client.
#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}",
    tag = "clients",
    params(("id" = i64, Path, description = "Client id")),
    request_body = ClientUpdate,
    responses(
        (status = 200, description = "Client updated", body = ClientResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Client not found"),
    )
)]
#[instrument(skip_all, fields(client_id = id))]
pub async fn update_client(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ClientId>,
    Json(request): Json<ClientUpdate>,
) -> Result<Json<ClientResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut clients = Clients::new(&mut conn);
    let existing = clients.get_by_id(id).await?.ok_or(Error::NotFound {
        resource: "client".to_string(),
        id: id.to_string(),
    })?;
    require_owner(&user, existing.owner_id, "update", "this client")?;

    let updated = clients
        .update(id, &ClientUpdateDBRequest::from_api(request))
        .await?;
    Ok(Json(updated.into()))
}

/// Delete a client.
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    tag = "clients",
    params(("id" = i64, Path, description = "Client id")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Client not found"),
    )
)]
#[instrument(skip_all, fields(client_id = id))]
pub async fn delete_client(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ClientId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut clients = Clients::new(&mut conn);
    let existing = clients.get_by_id(id).await?.ok_or(Error::NotFound {
        resource: "client".to_string(),
        id: id.to_string(),
    })?;
    require_owner(&user, existing.owner_id, "delete", "this client")?;

    clients.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
