//! Bill entity module: bills, their installments and payment receipts

pub mod descriptor;
pub mod handlers;
pub mod model;
pub mod receipt;

pub use descriptor::BillDescriptor;
pub use handlers::*;
pub use model::{Bill, BillDetail, CreateBill, Installment, UpdateBill, UpdateInstallment};
pub use receipt::{attach_receipt, detach_receipt};
