//! Quotation entity model

use crate::core::error::{BillingError, ValidationError};
use crate::core::money::Money;
use crate::entities::blank_as_none;
use crate::impl_record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of a quotation
///
/// ```text
/// requested ──▶ draft ──▶ sent ──▶ approved
///     │           │        ├────▶ rejected
///     └───────────┴──▶ rejected
///                          └────▶ expired ──▶ draft
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    /// Submitted from the public website, not yet worked on
    Requested,
    Draft,
    Sent,
    Approved,
    Rejected,
    Expired,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Requested => "requested",
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Approved => "approved",
            QuotationStatus::Rejected => "rejected",
            QuotationStatus::Expired => "expired",
        }
    }

    pub fn can_transition_to(&self, to: QuotationStatus) -> bool {
        use QuotationStatus::*;
        if *self == to {
            return true;
        }
        match self {
            Requested => matches!(to, Draft | Sent | Rejected),
            Draft => matches!(to, Sent | Rejected),
            Sent => matches!(to, Approved | Rejected | Expired | Draft),
            Expired => matches!(to, Draft),
            Approved | Rejected => false,
        }
    }

    pub fn transition(self, to: QuotationStatus) -> Result<QuotationStatus, BillingError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(BillingError::InvalidTransition {
                entity: "quotation",
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a quotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuotationItem {
    #[validate(length(min = 1, max = 500, message = "description is required"))]
    pub description: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    #[validate(custom(function = "validate_unit_price"))]
    pub unit_price: Money,
}

fn validate_unit_price(price: &Money) -> Result<(), validator::ValidationError> {
    if price.cents() >= 0 {
        Ok(())
    } else {
        Err(validator::ValidationError::new("unit_price")
            .with_message("unit_price must not be negative".into()))
    }
}

impl QuotationItem {
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: Uuid,
    /// `Q-<year>-<sequence>`
    pub number: String,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub items: Vec<QuotationItem>,
    pub total: Money,
    pub status: QuotationStatus,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Quotation, "quotations", "quotation");

/// Sum of the line totals
pub fn items_total(items: &[QuotationItem]) -> Result<Money, ValidationError> {
    items.iter().try_fold(Money::ZERO, |acc, item| {
        item.line_total()
            .and_then(|line| acc.cents().checked_add(line.cents()).map(Money::from_cents))
            .ok_or_else(|| ValidationError::field("items", "total is out of range"))
    })
}

/// Prefix shared by the numbers of one year, e.g. `Q-2026-`
pub fn number_prefix(year: i32) -> String {
    format!("Q-{}-", year)
}

/// Next number of the year after the highest existing sequence
///
/// Sequences are compared numerically: `Q-2026-10000` follows `Q-2026-9999`
/// even though it sorts before it as text.
pub fn next_number<'a>(year: i32, existing: impl IntoIterator<Item = &'a str>) -> String {
    let prefix = number_prefix(year);
    let sequence = existing
        .into_iter()
        .filter_map(|n| n.strip_prefix(prefix.as_str()))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:04}", prefix, sequence + 1)
}

/// Payload of `POST /quotations` and `PUT /quotations/{id}`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuotationInput {
    pub client_id: Option<Uuid>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 200))]
    pub client_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "invalid email address"))]
    pub client_email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 32))]
    pub client_phone: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<QuotationItem>,
    pub valid_until: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
    pub status: Option<QuotationStatus>,
}

/// Quote request sent by a website visitor
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(min = 1, max = 4000, message = "message is required"))]
    pub message: String,
}

impl Quotation {
    pub fn from_request(request: QuoteRequest, number: String) -> Self {
        let now = Utc::now();
        let client_name = match &request.company {
            Some(company) => format!("{} ({})", request.name.trim(), company),
            None => request.name.trim().to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            number,
            client_id: None,
            client_name,
            client_email: Some(request.email.trim().to_string()),
            client_phone: request.phone,
            items: Vec::new(),
            total: Money::ZERO,
            status: QuotationStatus::Requested,
            valid_until: None,
            notes: Some(request.message.trim().to_string()),
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}
