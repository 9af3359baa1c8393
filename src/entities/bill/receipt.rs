//! Payment receipt attach and detach handlers
//!
//! The database row and the storage object are written in two steps, so each
//! direction orders them to leave no dangling reference:
//!
//! ```text
//! attach: upload object ──▶ update row (on failure: remove object) ──▶ remove old object
//! detach: update row ──▶ remove object (failure only logged)
//! ```

use super::handlers::load_installment;
use super::model::Installment;
use crate::billing::receipt::{PDF_CONTENT_TYPE, receipt_path, validate_receipt};
use crate::billing::status::Status;
use crate::core::error::{AppError, BillingError};
use crate::core::events::DomainEvent;
use crate::core::extractors::{CurrentUser, Path};
use crate::core::record::Record;
use crate::core::upload::{read_upload_form, sanitize_filename};
use crate::server::host::AppState;
use axum::{
    Json,
    extract::{Multipart, State},
};
use chrono::Utc;
use uuid::Uuid;

const FILE_FIELD: &str = "file";

/// Upload a PDF receipt and mark the installment paid
pub async fn attach_receipt(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((bill_id, installment_id)): Path<(Uuid, Uuid)>,
    multipart: Multipart,
) -> Result<Json<Installment>, AppError> {
    let mut installment = load_installment(&state, bill_id, installment_id).await?;
    let from = installment.status;
    // Fail before uploading anything when the installment cannot be paid
    from.transition(Status::Paid, Installment::ENTITY)?;

    let max_bytes = state.config.uploads.max_receipt_bytes;
    let mut form = read_upload_form(multipart, FILE_FIELD, max_bytes).await?;
    let file = form.require_file(FILE_FIELD)?;
    validate_receipt(&file, max_bytes)?;

    let uploaded_at = Utc::now();
    let path = receipt_path(bill_id, installment_id, uploaded_at, &file.filename);
    let bucket = state.config.storage.receipts_bucket.clone();
    let size = file.size();
    let stored = state
        .objects
        .upload(&bucket, &path, file.bytes, PDF_CONTENT_TYPE)
        .await?;

    let previous = installment.receipt_path.clone();
    installment.attach_receipt(
        stored.public_url,
        stored.path.clone(),
        sanitize_filename(&file.filename, "receipt.pdf"),
        uploaded_at,
    );
    installment.set_status(Status::Paid, None, uploaded_at.date_naive())?;
    installment.touch(uploaded_at);

    let installment = match state
        .tables
        .installments
        .update(&installment_id, installment)
        .await
    {
        Ok(installment) => installment,
        Err(e) => {
            tracing::error!(%installment_id, %path, error = %e, "receipt update failed, removing uploaded file");
            if let Err(cleanup) = state.objects.remove(&bucket, std::slice::from_ref(&path)).await {
                tracing::error!(%path, error = %cleanup, "failed to remove orphaned receipt");
            }
            return Err(e.into());
        }
    };

    if let Some(old) = previous.filter(|old| *old != stored.path) {
        if let Err(e) = state.objects.remove(&bucket, &[old.clone()]).await {
            tracing::warn!(path = %old, error = %e, "failed to remove replaced receipt");
        }
    }

    tracing::info!(
        %bill_id,
        %installment_id,
        %path,
        size,
        caller = %caller.principal(),
        "receipt attached"
    );
    state.events.publish(DomainEvent::ReceiptAttached {
        bill_id,
        installment_id,
        path,
    });
    if from != Status::Paid {
        state.events.publish(DomainEvent::InstallmentStatusChanged {
            bill_id,
            installment_id,
            installment_number: installment.installment_number,
            amount: installment.amount,
            from,
            to: Status::Paid,
        });
    }

    Ok(Json(installment))
}

/// Remove the receipt reference, then the stored file
///
/// The installment keeps its status.
pub async fn detach_receipt(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((bill_id, installment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Installment>, AppError> {
    let mut installment = load_installment(&state, bill_id, installment_id).await?;
    let Some(path) = installment.clear_receipt() else {
        return Err(BillingError::NoReceipt { installment_id }.into());
    };
    installment.touch(Utc::now());

    let installment = state
        .tables
        .installments
        .update(&installment_id, installment)
        .await?;

    let bucket = &state.config.storage.receipts_bucket;
    if let Err(e) = state.objects.remove(bucket, std::slice::from_ref(&path)).await {
        tracing::warn!(%path, error = %e, "receipt reference cleared but file removal failed");
    }

    tracing::info!(%bill_id, %installment_id, caller = %caller.principal(), "receipt removed");
    state.events.publish(DomainEvent::ReceiptRemoved {
        bill_id,
        installment_id,
    });
    Ok(Json(installment))
}
