//! Routes that are not tied to a single entity table

pub mod auth;
pub mod dashboard;
pub mod uploads;

use crate::server::host::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/refresh", post(auth::refresh_session))
        .route("/auth/me", get(auth::me))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route(
            "/uploads",
            post(uploads::upload_image)
                .delete(uploads::remove_image)
                .layer(DefaultBodyLimit::disable()),
        )
}
