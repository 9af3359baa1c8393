//! SEO metadata per site page

use crate::config::SiteConfig;
use crate::entities::blank_as_none;
use crate::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoSetting {
    pub id: Uuid,
    /// Site path, e.g. `/services/retrofit`; unique
    pub page_path: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub no_index: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(SeoSetting, "seo_settings", "seo_setting");

/// Payload of `PUT /seo`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SeoInput {
    #[validate(
        length(min = 1, max = 300),
        custom(function = "validate_page_path")
    )]
    pub page_path: String,
    #[validate(length(min = 1, max = 120, message = "title is required"))]
    pub title: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 320))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 500))]
    pub keywords: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url(message = "og_image must be an absolute URL"))]
    pub og_image: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url(message = "canonical_url must be an absolute URL"))]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub no_index: bool,
}

fn validate_page_path(path: &str) -> Result<(), validator::ValidationError> {
    if path.starts_with('/') && !path.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("page_path")
            .with_message("page_path must start with '/' and contain no spaces".into()))
    }
}

impl SeoSetting {
    pub fn new(input: SeoInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            page_path: input.page_path,
            title: input.title,
            description: input.description,
            keywords: input.keywords,
            og_image: input.og_image,
            canonical_url: input.canonical_url,
            no_index: input.no_index,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field; `page_path` is the upsert key and stays
    pub fn apply(&mut self, input: SeoInput) {
        self.title = input.title;
        self.description = input.description;
        self.keywords = input.keywords;
        self.og_image = input.og_image;
        self.canonical_url = input.canonical_url;
        self.no_index = input.no_index;
    }
}

/// Metadata served to the public site for one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSeo {
    pub page_path: String,
    pub title: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub og_image: Option<String>,
    pub canonical_url: String,
    pub no_index: bool,
    /// True when nothing is stored for the page
    pub is_default: bool,
}

impl PageSeo {
    pub fn from_setting(setting: SeoSetting, site: &SiteConfig) -> Self {
        let canonical_url = setting
            .canonical_url
            .unwrap_or_else(|| site.url(&setting.page_path));
        Self {
            page_path: setting.page_path,
            title: setting.title,
            description: setting.description.or_else(|| Some(site.default_description.clone())),
            keywords: setting.keywords,
            og_image: setting.og_image,
            canonical_url,
            no_index: setting.no_index,
            is_default: false,
        }
    }

    pub fn defaults(page_path: &str, site: &SiteConfig) -> Self {
        Self {
            page_path: page_path.to_string(),
            title: site.default_title.clone(),
            description: Some(site.default_description.clone()),
            keywords: None,
            og_image: None,
            canonical_url: site.url(page_path),
            no_index: false,
            is_default: true,
        }
    }
}
