//! Shared test harness for storage backend testing
//!
//! Provides `Widget`, a record whose fields cover every JSON shape the
//! filters deal with (strings, integers, money, booleans, dates, nulls), and
//! helpers to create test data.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

pub mod data_service_tests;

use backoffice::core::money::Money;
use backoffice::impl_record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub quantity: i64,
    pub price: Money,
    pub active: bool,
    pub due_date: NaiveDate,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Widget, "widgets", "widget");

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

/// A widget with the given name; the other fields derive from `quantity`
pub fn widget(name: &str, quantity: i64) -> Widget {
    let now = Utc::now();
    Widget {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        quantity,
        price: Money::from_cents(quantity * 1_000),
        active: quantity % 2 == 0,
        due_date: date(1, 1) + chrono::Duration::days(quantity),
        note: None,
        created_at: now,
        updated_at: now,
    }
}

/// `count` widgets named `W0`, `W1`, ... with quantities 0..count
pub fn sample_batch(count: i64) -> Vec<Widget> {
    (0..count).map(|i| widget(&format!("W{}", i), i)).collect()
}
