//! Bill and installment HTTP handlers

use super::model::{
    Bill, BillDetail, BillFilter, CreateBill, Installment, UpdateBill, UpdateInstallment,
};
use crate::billing::schedule::{ScheduleRequest, generate_schedule};
use crate::billing::status::Status;
use crate::core::error::{AppError, EntityError, ValidationError};
use crate::core::events::DomainEvent;
use crate::core::extractors::{CurrentUser, Path, QueryString, ValidatedJson};
use crate::core::query::{ListParams, PaginatedResponse, Query, SortDirection};
use crate::core::record::Record;
use crate::entities::client::Client;
use crate::server::host::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

pub async fn list_bills(
    State(state): State<AppState>,
    _caller: CurrentUser,
    QueryString(params): QueryString<ListParams>,
    QueryString(filter): QueryString<BillFilter>,
) -> Result<Json<PaginatedResponse<Bill>>, AppError> {
    let mut query = Query::new();
    if let Some(status) = filter.status {
        query = query.eq("status", status);
    }
    if let Some(bill_type) = filter.bill_type {
        query = query.eq("bill_type", bill_type);
    }
    if let Some(company_id) = filter.company_id {
        query = query.eq("company_id", company_id);
    }

    let total = state.tables.bills.count(&query).await?;
    let query = query
        .order_by("created_at", SortDirection::Desc)
        .paginate(&params);
    let bills = state.tables.bills.list(&query).await?;

    Ok(Json(PaginatedResponse::new(bills, &params, total)))
}

pub async fn get_bill(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BillDetail>, AppError> {
    let bill = load_bill(&state, id).await?;
    let installments = installments_of(&state, id).await?;
    Ok(Json(BillDetail::new(bill, installments)))
}

/// Create a bill and its whole installment schedule
///
/// The bill row goes first; if the installment rows cannot be written the
/// bill is deleted again so no bill is left without installments.
pub async fn create_bill(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(input): ValidatedJson<CreateBill>,
) -> Result<(StatusCode, Json<BillDetail>), AppError> {
    let billing = &state.config.billing;
    let schedule = generate_schedule(
        &ScheduleRequest {
            total: input.total_amount,
            count: input.installment_count,
            first_due_date: input.first_due_date,
            interval_days: input.interval_days.unwrap_or(billing.default_interval_days),
        },
        billing.max_installments,
    )?;

    if state.tables.clients.get(&input.company_id).await?.is_none() {
        return Err(ValidationError::field(
            "company_id",
            format!("{} '{}' does not exist", Client::ENTITY, input.company_id),
        )
        .into());
    }

    let bill = state
        .tables
        .bills
        .insert(Bill::new(&input, caller.user_id()))
        .await?;

    let rows: Vec<Installment> = schedule
        .iter()
        .map(|scheduled| Installment::from_schedule(bill.id, scheduled))
        .collect();

    let installments = match state.tables.installments.insert_many(rows).await {
        Ok(installments) => installments,
        Err(e) => {
            tracing::error!(bill_id = %bill.id, error = %e, "installment insert failed, removing bill");
            if let Err(cleanup) = state.tables.bills.delete(&bill.id).await {
                tracing::error!(bill_id = %bill.id, error = %cleanup, "failed to remove orphaned bill");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        bill_id = %bill.id,
        total = %bill.total_amount,
        installments = installments.len(),
        caller = %caller.principal(),
        "bill created"
    );
    state.events.publish(DomainEvent::BillCreated {
        bill_id: bill.id,
        bill_type: bill.bill_type,
        total: bill.total_amount,
        installments: input.installment_count,
    });

    Ok((StatusCode::CREATED, Json(BillDetail::new(bill, installments))))
}

pub async fn update_bill(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<UpdateBill>,
) -> Result<Json<BillDetail>, AppError> {
    let mut bill = load_bill(&state, id).await?;

    if let Some(company_id) = input.company_id {
        if state.tables.clients.get(&company_id).await?.is_none() {
            return Err(ValidationError::field(
                "company_id",
                format!("{} '{}' does not exist", Client::ENTITY, company_id),
            )
            .into());
        }
        bill.company_id = company_id;
    }
    if input.description.is_some() {
        bill.description = input.description;
    }
    if input.admin_notes.is_some() {
        bill.admin_notes = input.admin_notes;
    }
    if let Some(status) = input.status {
        bill.set_status(status)?;
    }
    bill.touch(Utc::now());

    let bill = state.tables.bills.update(&id, bill).await?;
    let installments = installments_of(&state, id).await?;
    Ok(Json(BillDetail::new(bill, installments)))
}

/// Delete a bill, its installments and their receipt files
pub async fn delete_bill(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_bill(&state, id).await?;

    let receipts: Vec<String> = installments_of(&state, id)
        .await?
        .into_iter()
        .filter_map(|i| i.receipt_path)
        .collect();

    let removed = state
        .tables
        .installments
        .delete_where(&Query::new().eq("bill_id", id))
        .await?;
    state.tables.bills.delete(&id).await?;

    if !receipts.is_empty() {
        let bucket = &state.config.storage.receipts_bucket;
        if let Err(e) = state.objects.remove(bucket, &receipts).await {
            tracing::warn!(bill_id = %id, error = %e, "failed to remove receipt files of deleted bill");
        }
    }

    tracing::info!(bill_id = %id, installments = removed, caller = %caller.principal(), "bill deleted");
    state.events.publish(DomainEvent::BillDeleted { bill_id: id });
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_installment(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((bill_id, installment_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(input): ValidatedJson<UpdateInstallment>,
) -> Result<Json<Installment>, AppError> {
    let mut installment = load_installment(&state, bill_id, installment_id).await?;
    let from = installment.status;

    input.apply_to(&mut installment, Utc::now().date_naive())?;
    installment.touch(Utc::now());
    let installment = state
        .tables
        .installments
        .update(&installment_id, installment)
        .await?;

    if installment.status != from {
        tracing::info!(
            %bill_id,
            %installment_id,
            from = %from,
            to = %installment.status,
            caller = %caller.principal(),
            "installment status changed"
        );
        state.events.publish(DomainEvent::InstallmentStatusChanged {
            bill_id,
            installment_id,
            installment_number: installment.installment_number,
            amount: installment.amount,
            from,
            to: installment.status,
        });
    }
    Ok(Json(installment))
}

#[derive(Debug, Serialize)]
pub struct SweepResult {
    pub updated: usize,
    pub as_of: NaiveDate,
}

/// Mark every pending installment past its due date as overdue
pub async fn sweep_overdue(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<SweepResult>, AppError> {
    let today = Utc::now().date_naive();
    let updated = mark_overdue(&state, today).await?;
    tracing::info!(updated, %today, caller = %caller.principal(), "overdue sweep finished");
    Ok(Json(SweepResult {
        updated,
        as_of: today,
    }))
}

/// Move pending installments due before `today` to overdue
pub async fn mark_overdue(state: &AppState, today: NaiveDate) -> Result<usize, AppError> {
    let query = Query::new()
        .eq("status", Status::Pending)
        .lt("due_date", today);
    let due = state.tables.installments.list_all(&query).await?;

    let mut updated = 0;
    for mut installment in due {
        let id = installment.id;
        installment.set_status(Status::Overdue, None, today)?;
        installment.touch(Utc::now());
        state.tables.installments.update(&id, installment).await?;
        updated += 1;
    }

    state
        .events
        .publish(DomainEvent::InstallmentsOverdue { count: updated });
    Ok(updated)
}

pub(crate) async fn load_bill(state: &AppState, id: Uuid) -> Result<Bill, AppError> {
    state
        .tables
        .bills
        .get(&id)
        .await?
        .ok_or_else(|| EntityError::not_found(Bill::ENTITY, id).into())
}

/// Installment addressed through its bill; 404 when it belongs to another bill
pub(crate) async fn load_installment(
    state: &AppState,
    bill_id: Uuid,
    installment_id: Uuid,
) -> Result<Installment, AppError> {
    load_bill(state, bill_id).await?;
    let installment = state
        .tables
        .installments
        .get(&installment_id)
        .await?
        .ok_or_else(|| EntityError::not_found(Installment::ENTITY, installment_id))?;

    if installment.bill_id != bill_id {
        return Err(EntityError::Mismatch {
            child: Installment::ENTITY.to_string(),
            child_id: installment_id,
            parent: Bill::ENTITY.to_string(),
            parent_id: bill_id,
        }
        .into());
    }
    Ok(installment)
}

pub(crate) async fn installments_of(
    state: &AppState,
    bill_id: Uuid,
) -> Result<Vec<Installment>, AppError> {
    let query = Query::new()
        .eq("bill_id", bill_id)
        .order_by("installment_number", SortDirection::Asc);
    Ok(state.tables.installments.list_all(&query).await?)
}
