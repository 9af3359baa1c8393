//! `GET /og-image`: Open Graph card rendered as SVG

use super::templates::OG_IMAGE;
use crate::core::error::AppError;
use crate::core::extractors::QueryString;
use crate::server::host::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use tera::Tera;

const MAX_LINE_CHARS: usize = 30;
const MAX_TITLE_LINES: usize = 3;
const MAX_SUBTITLE_CHARS: usize = 70;

#[derive(Debug, Default, Deserialize)]
pub struct OgImageQuery {
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

/// Greedy word wrap; the last kept line gets an ellipsis when text is cut
pub fn wrap_title(title: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in title.split_whitespace() {
        let word: String = word.chars().take(max_chars).collect();
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if !current.is_empty() && needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let kept: String = last.chars().take(max_chars.saturating_sub(1)).collect();
            *last = format!("{}…", kept.trim_end());
        }
    }
    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

pub fn render_og_image(
    templates: &Tera,
    site_name: &str,
    title: &str,
    subtitle: Option<&str>,
) -> Result<String, AppError> {
    let mut context = tera::Context::new();
    context.insert("site_name", site_name);
    context.insert(
        "title_lines",
        &wrap_title(title, MAX_LINE_CHARS, MAX_TITLE_LINES),
    );
    context.insert("subtitle", &subtitle.map(|s| truncate(s, MAX_SUBTITLE_CHARS)));
    Ok(templates.render(OG_IMAGE, &context)?)
}

pub async fn og_image(
    State(state): State<AppState>,
    QueryString(query): QueryString<OgImageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let site = &state.config.site;
    let title = query
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&site.default_title);
    let subtitle = query
        .subtitle
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let svg = render_og_image(&state.templates, &site.name, title, subtitle)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        svg,
    ))
}
