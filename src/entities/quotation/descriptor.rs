//! Entity descriptor for Quotation

use super::handlers::{
    create_quotation, delete_quotation, get_quotation, list_quotations, request_quote,
    update_quotation,
};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Descriptor for the Quotation entity
pub struct QuotationDescriptor;

impl EntityDescriptor for QuotationDescriptor {
    fn entity_type(&self) -> &str {
        "quotation"
    }

    fn plural(&self) -> &str {
        "quotations"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/quotations", get(list_quotations).post(create_quotation))
            // Public: the website's quote form
            .route("/quotations/request", post(request_quote))
            .route(
                "/quotations/{id}",
                get(get_quotation)
                    .put(update_quotation)
                    .delete(delete_quotation),
            )
    }
}
