//! Bill and installment statuses

use crate::core::error::BillingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status shared by bills and installments
///
/// ```text
/// pending ──▶ paid ──▶ pending
///    │  ▲
///    ▼  │
/// overdue ──▶ paid
///
/// pending | overdue ──▶ cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::Paid,
        Status::Overdue,
        Status::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Paid => "paid",
            Status::Overdue => "overdue",
            Status::Cancelled => "cancelled",
        }
    }

    /// Still expecting a payment
    pub fn is_open(&self) -> bool {
        matches!(self, Status::Pending | Status::Overdue)
    }

    pub fn can_transition_to(&self, to: Status) -> bool {
        if *self == to {
            return true;
        }
        match self {
            Status::Pending => matches!(to, Status::Paid | Status::Overdue | Status::Cancelled),
            Status::Overdue => matches!(to, Status::Paid | Status::Pending | Status::Cancelled),
            Status::Paid => matches!(to, Status::Pending),
            Status::Cancelled => false,
        }
    }

    /// Validate a move to `to`; `entity` names the record in the error
    pub fn transition(self, to: Status, entity: &'static str) -> Result<Status, BillingError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(BillingError::InvalidTransition {
                entity,
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// Direction of the money flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillType {
    /// Owed to the company
    Receivable,
    /// Owed by the company
    Payable,
}

impl BillType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillType::Receivable => "receivable",
            BillType::Payable => "payable",
        }
    }
}

impl fmt::Display for BillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
