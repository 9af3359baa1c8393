//! Billing rules: installment schedules, status transitions, receipts
//!
//! Everything here is pure; the bill handlers do the I/O.

pub mod receipt;
pub mod schedule;
pub mod status;
pub mod summary;

pub use schedule::{ScheduleRequest, ScheduledInstallment, generate_schedule};
pub use status::{BillType, Status};
pub use summary::BillSummary;
