//! Bill totals derived from its installments

use crate::billing::status::Status;
use crate::core::money::Money;
use chrono::NaiveDate;
use serde::Serialize;

/// Read-only view of how much of a bill is settled
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillSummary {
    pub installment_count: usize,
    pub pending_count: usize,
    pub paid_count: usize,
    pub overdue_count: usize,
    pub cancelled_count: usize,
    pub paid_amount: Money,
    /// Pending plus overdue
    pub outstanding_amount: Money,
    /// Earliest due date among open installments
    pub next_due_date: Option<NaiveDate>,
    /// Whether the installment amounts still add up to the bill total
    pub balanced: bool,
}

impl BillSummary {
    pub fn from_installments<I>(total: Money, installments: I) -> Self
    where
        I: IntoIterator<Item = (Status, Money, NaiveDate)>,
    {
        let mut summary = BillSummary::default();
        let mut scheduled = Money::ZERO;

        for (status, amount, due_date) in installments {
            summary.installment_count += 1;
            scheduled += amount;
            match status {
                Status::Pending => summary.pending_count += 1,
                Status::Paid => summary.paid_count += 1,
                Status::Overdue => summary.overdue_count += 1,
                Status::Cancelled => summary.cancelled_count += 1,
            }
            if status == Status::Paid {
                summary.paid_amount += amount;
            }
            if status.is_open() {
                summary.outstanding_amount += amount;
                summary.next_due_date = Some(match summary.next_due_date {
                    Some(current) => current.min(due_date),
                    None => due_date,
                });
            }
        }

        summary.balanced = scheduled == total;
        summary
    }
}
