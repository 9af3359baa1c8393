//! Public documents for the marketing site: sitemap and Open Graph images

pub mod og_image;
pub mod sitemap;
pub mod templates;

use crate::server::host::AppState;
use axum::{Router, routing::get};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap::sitemap))
        .route("/og-image", get(og_image::og_image))
}
