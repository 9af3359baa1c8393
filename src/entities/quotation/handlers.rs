//! Quotation HTTP handlers

use super::model::{
    Quotation, QuotationInput, QuotationStatus, QuoteRequest, items_total, next_number,
    number_prefix,
};
use crate::core::error::{AppError, EntityError, ValidationError};
use crate::core::events::DomainEvent;
use crate::core::extractors::{CurrentUser, Path, QueryString, ValidatedJson};
use crate::core::query::{FilterOp, ListParams, PaginatedResponse, Query, SortDirection};
use crate::core::record::Record;
use crate::entities::client::load_client;
use crate::server::host::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct QuotationFilter {
    pub status: Option<QuotationStatus>,
    pub client_id: Option<Uuid>,
    /// Search on client name
    pub q: Option<String>,
}

pub async fn list_quotations(
    State(state): State<AppState>,
    _caller: CurrentUser,
    QueryString(params): QueryString<ListParams>,
    QueryString(filter): QueryString<QuotationFilter>,
) -> Result<Json<PaginatedResponse<Quotation>>, AppError> {
    let mut query = Query::new();
    if let Some(status) = filter.status {
        query = query.eq("status", status);
    }
    if let Some(client_id) = filter.client_id {
        query = query.eq("client_id", client_id);
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.contains("client_name", q);
    }

    let total = state.tables.quotations.count(&query).await?;
    let query = query
        .order_by("created_at", SortDirection::Desc)
        .paginate(&params);
    let quotations = state.tables.quotations.list(&query).await?;

    Ok(Json(PaginatedResponse::new(quotations, &params, total)))
}

pub async fn get_quotation(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Quotation>, AppError> {
    Ok(Json(load_quotation(&state, id).await?))
}

pub async fn create_quotation(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(input): ValidatedJson<QuotationInput>,
) -> Result<(StatusCode, Json<Quotation>), AppError> {
    let client_name = match (&input.client_name, input.client_id) {
        (Some(name), _) => name.clone(),
        (None, Some(client_id)) => load_client(&state, client_id).await?.name,
        (None, None) => {
            return Err(ValidationError::field(
                "client_name",
                "a client name or an existing client is required",
            )
            .into());
        }
    };

    let now = Utc::now();
    let quotation = Quotation {
        id: Uuid::new_v4(),
        number: allocate_number(&state).await?,
        client_id: input.client_id,
        client_name,
        client_email: input.client_email,
        client_phone: input.client_phone,
        total: items_total(&input.items)?,
        items: input.items,
        status: input.status.unwrap_or(QuotationStatus::Draft),
        valid_until: input.valid_until,
        notes: input.notes,
        created_by: caller.user_id(),
        created_at: now,
        updated_at: now,
    };

    let quotation = state.tables.quotations.insert(quotation).await?;
    tracing::info!(
        quotation_id = %quotation.id,
        number = %quotation.number,
        total = %quotation.total,
        caller = %caller.principal(),
        "quotation created"
    );
    Ok((StatusCode::CREATED, Json(quotation)))
}

/// Public quote request from the website contact form
pub async fn request_quote(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<QuoteRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let number = allocate_number(&state).await?;
    let quotation = Quotation::from_request(request, number);
    let quotation = state.tables.quotations.insert(quotation).await?;

    tracing::info!(quotation_id = %quotation.id, number = %quotation.number, "quote requested");
    state.events.publish(DomainEvent::QuoteRequested {
        quotation_id: quotation.id,
        number: quotation.number.clone(),
        client_name: quotation.client_name.clone(),
    });

    // Visitors only learn the reference number
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "number": quotation.number })),
    ))
}

pub async fn update_quotation(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<QuotationInput>,
) -> Result<Json<Quotation>, AppError> {
    let mut quotation = load_quotation(&state, id).await?;

    if let Some(client_id) = input.client_id {
        let client = load_client(&state, client_id).await?;
        quotation.client_id = Some(client_id);
        if input.client_name.is_none() {
            quotation.client_name = client.name;
        }
    }
    if let Some(name) = input.client_name {
        quotation.client_name = name;
    }
    if input.client_email.is_some() {
        quotation.client_email = input.client_email;
    }
    if input.client_phone.is_some() {
        quotation.client_phone = input.client_phone;
    }
    if !input.items.is_empty() {
        quotation.total = items_total(&input.items)?;
        quotation.items = input.items;
    }
    if input.valid_until.is_some() {
        quotation.valid_until = input.valid_until;
    }
    if input.notes.is_some() {
        quotation.notes = input.notes;
    }
    if let Some(status) = input.status {
        quotation.status = quotation.status.transition(status)?;
    }
    quotation.touch(Utc::now());

    let quotation = state.tables.quotations.update(&id, quotation).await?;
    Ok(Json(quotation))
}

pub async fn delete_quotation(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_quotation(&state, id).await?;
    state.tables.quotations.delete(&id).await?;
    tracing::info!(quotation_id = %id, caller = %caller.principal(), "quotation deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_quotation(state: &AppState, id: Uuid) -> Result<Quotation, AppError> {
    state
        .tables
        .quotations
        .get(&id)
        .await?
        .ok_or_else(|| EntityError::not_found(Quotation::ENTITY, id).into())
}

/// Next `Q-<year>-<seq>` number after the highest one of the current year
async fn allocate_number(state: &AppState) -> Result<String, AppError> {
    let year = Utc::now().year();
    let query = Query::new().filter("number", FilterOp::ILike, format!("{}*", number_prefix(year)));
    let existing = state.tables.quotations.list_all(&query).await?;
    Ok(next_number(year, existing.iter().map(|q| q.number.as_str())))
}
