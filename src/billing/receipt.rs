//! Payment receipt checks and storage layout

use crate::core::error::UploadError;
use crate::core::upload::{UploadedFile, ensure_allowed_type, sanitize_filename};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Accept only PDFs: declared type and file signature must agree
pub fn validate_receipt(file: &UploadedFile, max_bytes: usize) -> Result<(), UploadError> {
    if file.size() > max_bytes {
        return Err(UploadError::TooLarge {
            size: file.size(),
            limit: max_bytes,
        });
    }
    ensure_allowed_type(file, &[PDF_CONTENT_TYPE])?;
    if !file.bytes.starts_with(PDF_MAGIC) {
        return Err(UploadError::ContentMismatch(PDF_CONTENT_TYPE.to_string()));
    }
    Ok(())
}

/// `bills/{bill}/installments/{installment}/{millis}_{name}`
pub fn receipt_path(
    bill_id: Uuid,
    installment_id: Uuid,
    uploaded_at: DateTime<Utc>,
    filename: &str,
) -> String {
    format!(
        "bills/{}/installments/{}/{}_{}",
        bill_id,
        installment_id,
        uploaded_at.timestamp_millis(),
        sanitize_filename(filename, "receipt.pdf")
    )
}
