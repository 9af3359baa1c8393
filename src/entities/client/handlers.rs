//! Client HTTP handlers

use super::model::{Client, ClientInput};
use crate::core::error::{AppError, EntityError};
use crate::core::extractors::{CurrentUser, Path, QueryString, ValidatedJson};
use crate::core::query::{ListParams, PaginatedResponse, Query, SortDirection};
use crate::core::record::Record;
use crate::server::host::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ClientFilter {
    /// Case-insensitive search on the company name
    pub q: Option<String>,
}

pub async fn list_clients(
    State(state): State<AppState>,
    _caller: CurrentUser,
    QueryString(params): QueryString<ListParams>,
    QueryString(filter): QueryString<ClientFilter>,
) -> Result<Json<PaginatedResponse<Client>>, AppError> {
    let mut query = Query::new();
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.contains("name", q);
    }

    let total = state.tables.clients.count(&query).await?;
    let query = query
        .order_by("name", SortDirection::Asc)
        .paginate(&params);
    let clients = state.tables.clients.list(&query).await?;

    Ok(Json(PaginatedResponse::new(clients, &params, total)))
}

pub async fn get_client(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = load_client(&state, id).await?;
    Ok(Json(client))
}

pub async fn create_client(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(input): ValidatedJson<ClientInput>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let client = Client::new(input, caller.user_id());
    let client = state.tables.clients.insert(client).await?;
    tracing::info!(client_id = %client.id, caller = %caller.principal(), "client created");
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<ClientInput>,
) -> Result<Json<Client>, AppError> {
    let mut client = load_client(&state, id).await?;
    client.apply(input);
    client.touch(chrono::Utc::now());
    let client = state.tables.clients.update(&id, client).await?;
    Ok(Json(client))
}

/// Refuses while bills still reference the client
pub async fn delete_client(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_client(&state, id).await?;

    let bills = state
        .tables
        .bills
        .count(&Query::new().eq("company_id", id))
        .await?;
    if bills > 0 {
        return Err(EntityError::InUse {
            entity_type: Client::ENTITY.to_string(),
            id,
            referenced_by: "bills".to_string(),
            count: bills,
        }
        .into());
    }

    state.tables.clients.delete(&id).await?;
    tracing::info!(client_id = %id, caller = %caller.principal(), "client deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn load_client(state: &AppState, id: Uuid) -> Result<Client, AppError> {
    state
        .tables
        .clients
        .get(&id)
        .await?
        .ok_or_else(|| EntityError::not_found(Client::ENTITY, id).into())
}
