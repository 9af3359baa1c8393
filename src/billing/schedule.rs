//! Installment schedule generation

use crate::core::error::BillingError;
use crate::core::money::Money;
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Parameters of a schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub total: Money,
    pub count: u32,
    pub first_due_date: NaiveDate,
    pub interval_days: u32,
}

/// One generated installment, before it becomes a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledInstallment {
    /// 1-based
    pub number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
}

/// Split a total into `count` installments spaced `interval_days` apart.
///
/// The k-th installment (0-based) is due on `first_due_date + k * interval_days`.
/// Amounts sum exactly to the total: the cent remainder goes one cent at a
/// time to the earliest installments.
pub fn generate_schedule(
    request: &ScheduleRequest,
    max_installments: u32,
) -> Result<Vec<ScheduledInstallment>, BillingError> {
    if request.count == 0 || request.count > max_installments {
        return Err(BillingError::InvalidInstallmentCount {
            count: request.count,
            max: max_installments,
        });
    }
    if !request.total.is_positive() {
        return Err(BillingError::NonPositiveAmount);
    }
    if request.count > 1 && request.interval_days == 0 {
        return Err(BillingError::InvalidInterval);
    }

    request
        .total
        .split_even(request.count)
        .into_iter()
        .zip(0u32..)
        .map(|(amount, k)| {
            let number = k + 1;
            let offset = u64::from(k) * u64::from(request.interval_days);
            let due_date = request
                .first_due_date
                .checked_add_days(Days::new(offset))
                .ok_or(BillingError::DueDateOverflow { number })?;
            Ok(ScheduledInstallment {
                number,
                due_date,
                amount,
            })
        })
        .collect()
}
