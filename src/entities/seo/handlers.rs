//! SEO settings HTTP handlers

use super::model::{PageSeo, SeoInput, SeoSetting};
use crate::core::error::{AppError, EntityError, ValidationError};
use crate::core::extractors::{CurrentUser, Path, QueryString, ValidatedJson};
use crate::core::query::{ListParams, PaginatedResponse, Query, SortDirection};
use crate::core::record::Record;
use crate::server::host::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub path: Option<String>,
}

/// Public list, used by the site at build time
pub async fn list_seo(
    State(state): State<AppState>,
    QueryString(params): QueryString<ListParams>,
) -> Result<Json<PaginatedResponse<SeoSetting>>, AppError> {
    let query = Query::new();
    let total = state.tables.seo.count(&query).await?;
    let query = query
        .order_by("page_path", SortDirection::Asc)
        .paginate(&params);
    let settings = state.tables.seo.list(&query).await?;
    Ok(Json(PaginatedResponse::new(settings, &params, total)))
}

/// Settings of one page, or the site defaults when none are stored
pub async fn get_page_seo(
    State(state): State<AppState>,
    QueryString(page): QueryString<PageQuery>,
) -> Result<Json<PageSeo>, AppError> {
    let path = page
        .path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("/");
    if !path.starts_with('/') {
        return Err(ValidationError::Query {
            name: "path".to_string(),
            message: "must start with '/'".to_string(),
        }
        .into());
    }

    let site = &state.config.site;
    let seo = match find_by_path(&state, path).await? {
        Some(setting) => PageSeo::from_setting(setting, site),
        None => PageSeo::defaults(path, site),
    };
    Ok(Json(seo))
}

/// Create or replace the settings of `page_path`
pub async fn upsert_seo(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(input): ValidatedJson<SeoInput>,
) -> Result<(StatusCode, Json<SeoSetting>), AppError> {
    match find_by_path(&state, &input.page_path).await? {
        Some(mut setting) => {
            let id = setting.id;
            setting.apply(input);
            setting.touch(Utc::now());
            let setting = state.tables.seo.update(&id, setting).await?;
            tracing::info!(page_path = %setting.page_path, caller = %caller.principal(), "seo settings updated");
            Ok((StatusCode::OK, Json(setting)))
        }
        None => {
            let setting = state.tables.seo.insert(SeoSetting::new(input)).await?;
            tracing::info!(page_path = %setting.page_path, caller = %caller.principal(), "seo settings created");
            Ok((StatusCode::CREATED, Json(setting)))
        }
    }
}

pub async fn delete_seo(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.tables.seo.get(&id).await?.is_none() {
        return Err(EntityError::not_found(SeoSetting::ENTITY, id).into());
    }
    state.tables.seo.delete(&id).await?;
    tracing::info!(seo_id = %id, caller = %caller.principal(), "seo settings deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_by_path(state: &AppState, path: &str) -> Result<Option<SeoSetting>, AppError> {
    let query = Query::new().eq("page_path", path).limit(1);
    Ok(state.tables.seo.list(&query).await?.into_iter().next())
}
