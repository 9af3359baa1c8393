//! `GET /sitemap.xml`
//!
//! Configured static pages are always listed. Pages with stored SEO settings
//! are added from the database; that read is bounded by
//! `sitemap.fetch_timeout_ms` and on timeout or error only the static pages
//! are emitted.

use super::templates::SITEMAP;
use crate::config::AppConfig;
use crate::core::error::AppError;
use crate::core::query::{Query, SortDirection};
use crate::entities::seo::SeoSetting;
use crate::server::host::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use serde::Serialize;
use tera::Tera;

/// Priority and change frequency of pages that only exist in the database
const DYNAMIC_PRIORITY: f32 = 0.5;
const DYNAMIC_CHANGEFREQ: &str = "monthly";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: String,
    /// One decimal, as sitemaps expect
    pub priority: String,
}

/// Merge the configured pages with stored SEO settings
///
/// Stored settings give a static page its `lastmod`, add unlisted pages and
/// drop pages marked `no_index`. Output keeps the static order first.
pub fn sitemap_urls(config: &AppConfig, settings: &[SeoSetting]) -> Vec<SitemapUrl> {
    let find = |path: &str| settings.iter().find(|s| s.page_path == path);

    let mut urls: Vec<SitemapUrl> = config
        .site
        .static_pages
        .iter()
        .filter(|page| !find(&page.path).is_some_and(|s| s.no_index))
        .map(|page| SitemapUrl {
            loc: config.site_url(&page.path),
            lastmod: find(&page.path).map(|s| s.updated_at.date_naive().to_string()),
            changefreq: page.changefreq.clone(),
            priority: format!("{:.1}", page.priority),
        })
        .collect();

    let is_static = |path: &str| config.site.static_pages.iter().any(|p| p.path == path);
    urls.extend(
        settings
            .iter()
            .filter(|s| !s.no_index && !is_static(&s.page_path))
            .map(|s| SitemapUrl {
                loc: config.site_url(&s.page_path),
                lastmod: Some(s.updated_at.date_naive().to_string()),
                changefreq: DYNAMIC_CHANGEFREQ.to_string(),
                priority: format!("{:.1}", DYNAMIC_PRIORITY),
            }),
    );
    urls
}

pub fn render_sitemap(templates: &Tera, urls: &[SitemapUrl]) -> Result<String, AppError> {
    let mut context = tera::Context::new();
    context.insert("urls", urls);
    Ok(templates.render(SITEMAP, &context)?)
}

/// Stored settings, or none when the backend is slow or failing
async fn fetch_settings(state: &AppState) -> Vec<SeoSetting> {
    let query = Query::new().order_by("page_path", SortDirection::Asc);
    let fetch = state.tables.seo.list_all(&query);
    match tokio::time::timeout(state.config.sitemap_timeout(), fetch).await {
        Ok(Ok(settings)) => settings,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "sitemap falling back to static pages");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = state.config.sitemap.fetch_timeout_ms,
                "sitemap fetch timed out, falling back to static pages"
            );
            Vec::new()
        }
    }
}

pub async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let settings = fetch_settings(&state).await;
    let urls = sitemap_urls(&state.config, &settings);
    let body = render_sitemap(&state.templates, &urls)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/xml; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        body,
    ))
}
