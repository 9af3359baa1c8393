//! Entity descriptor for Bill

use super::handlers::{
    create_bill, delete_bill, get_bill, list_bills, sweep_overdue, update_bill,
    update_installment,
};
use super::receipt::{attach_receipt, detach_receipt};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Descriptor for the Bill entity, installments included
pub struct BillDescriptor;

impl EntityDescriptor for BillDescriptor {
    fn entity_type(&self) -> &str {
        "bill"
    }

    fn plural(&self) -> &str {
        "bills"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/bills", get(list_bills).post(create_bill))
            .route("/bills/overdue-sweep", post(sweep_overdue))
            .route(
                "/bills/{id}",
                get(get_bill).put(update_bill).delete(delete_bill),
            )
            .route(
                "/bills/{id}/installments/{installment_id}",
                put(update_installment),
            )
            .route(
                "/bills/{id}/installments/{installment_id}/receipt",
                post(attach_receipt)
                    .delete(detach_receipt)
                    .layer(DefaultBodyLimit::disable()),
            )
    }
}
