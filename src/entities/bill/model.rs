//! Bill and installment models

use crate::billing::schedule::ScheduledInstallment;
use crate::billing::status::{BillType, Status};
use crate::billing::summary::BillSummary;
use crate::core::error::{AppError, BillingError, ValidationError};
use crate::core::money::Money;
use crate::entities::blank_as_none;
use crate::impl_record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A receivable or payable obligation, split into installments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    /// The client this bill belongs to
    pub company_id: Uuid,
    pub total_amount: Money,
    pub bill_type: BillType,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Bill, "bills", "bill");

/// One scheduled payment of a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: Uuid,
    pub bill_id: Uuid,
    /// 1-based position in the schedule
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub status: Status,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub receipt_path: Option<String>,
    #[serde(default)]
    pub receipt_filename: Option<String>,
    #[serde(default)]
    pub receipt_uploaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Installment, "bill_installments", "installment");

impl Bill {
    pub fn new(input: &CreateBill, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id: input.company_id,
            total_amount: input.total_amount,
            bill_type: input.bill_type,
            description: input.description.clone(),
            status: Status::Pending,
            admin_notes: input.admin_notes.clone(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, to: Status) -> Result<(), BillingError> {
        self.status = self.status.transition(to, "bill")?;
        Ok(())
    }
}

impl Installment {
    pub fn from_schedule(bill_id: Uuid, scheduled: &ScheduledInstallment) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bill_id,
            installment_number: scheduled.number,
            due_date: scheduled.due_date,
            amount: scheduled.amount,
            status: Status::Pending,
            paid_date: None,
            receipt_url: None,
            receipt_path: None,
            receipt_filename: None,
            receipt_uploaded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `to`, keeping `paid_date` consistent with the status
    ///
    /// Entering `paid` sets `paid_date` to `paid_on`, else keeps an existing
    /// date, else uses `today`. Leaving `paid` clears it.
    pub fn set_status(
        &mut self,
        to: Status,
        paid_on: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), BillingError> {
        self.status = self.status.transition(to, "installment")?;
        if self.status == Status::Paid {
            self.paid_date = paid_on.or(self.paid_date).or(Some(today));
        } else {
            self.paid_date = None;
        }
        Ok(())
    }

    pub fn has_receipt(&self) -> bool {
        self.receipt_path.is_some()
    }

    pub fn attach_receipt(
        &mut self,
        url: String,
        path: String,
        filename: String,
        uploaded_at: DateTime<Utc>,
    ) {
        self.receipt_url = Some(url);
        self.receipt_path = Some(path);
        self.receipt_filename = Some(filename);
        self.receipt_uploaded_at = Some(uploaded_at);
    }

    /// Clear the receipt fields, returning the previous storage path
    pub fn clear_receipt(&mut self) -> Option<String> {
        self.receipt_url = None;
        self.receipt_filename = None;
        self.receipt_uploaded_at = None;
        self.receipt_path.take()
    }
}

/// Payload of `POST /bills`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBill {
    pub company_id: Uuid,
    pub total_amount: Money,
    pub bill_type: BillType,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2000))]
    pub admin_notes: Option<String>,
    /// Number of installments
    #[serde(alias = "installments")]
    #[validate(range(min = 1, message = "at least one installment is required"))]
    pub installment_count: u32,
    pub first_due_date: NaiveDate,
    /// Days between due dates; the configured default when absent
    #[serde(default)]
    pub interval_days: Option<u32>,
}

/// Payload of `PUT /bills/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBill {
    pub company_id: Option<Uuid>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2000))]
    pub admin_notes: Option<String>,
    pub status: Option<Status>,
}

/// Payload of `PUT /bills/{id}/installments/{iid}`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateInstallment {
    pub status: Option<Status>,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
}

impl UpdateInstallment {
    /// Apply to an installment as of `today`
    pub fn apply_to(&self, installment: &mut Installment, today: NaiveDate) -> Result<(), AppError> {
        if let Some(due_date) = self.due_date {
            installment.due_date = due_date;
        }
        match self.status {
            Some(status) => installment.set_status(status, self.paid_date, today)?,
            None => {
                if let Some(paid_date) = self.paid_date {
                    if installment.status != Status::Paid {
                        return Err(ValidationError::field(
                            "paid_date",
                            "only paid installments have a payment date",
                        )
                        .into());
                    }
                    installment.paid_date = Some(paid_date);
                }
            }
        }
        Ok(())
    }
}

/// Filters of `GET /bills`
#[derive(Debug, Default, Deserialize)]
pub struct BillFilter {
    pub status: Option<Status>,
    pub bill_type: Option<BillType>,
    pub company_id: Option<Uuid>,
}

/// A bill with its installments and derived totals
#[derive(Debug, Serialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub installments: Vec<Installment>,
    pub summary: BillSummary,
}

impl BillDetail {
    pub fn new(bill: Bill, mut installments: Vec<Installment>) -> Self {
        installments.sort_by_key(|i| i.installment_number);
        let summary = BillSummary::from_installments(
            bill.total_amount,
            installments.iter().map(|i| (i.status, i.amount, i.due_date)),
        );
        Self {
            bill,
            installments,
            summary,
        }
    }
}
