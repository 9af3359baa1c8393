//! Tera templates for the public documents
//!
//! Templates are compiled into the binary. Autoescaping is off because the
//! outputs are XML and SVG, not HTML; interpolations go through Tera's
//! `escape_xml` filter instead.

use tera::Tera;

pub const SITEMAP: &str = "sitemap.xml";
pub const OG_IMAGE: &str = "og-image.svg";

const SITEMAP_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{%- for url in urls %}
  <url>
    <loc>{{ url.loc | escape_xml }}</loc>
    {%- if url.lastmod %}
    <lastmod>{{ url.lastmod }}</lastmod>
    {%- endif %}
    <changefreq>{{ url.changefreq | escape_xml }}</changefreq>
    <priority>{{ url.priority }}</priority>
  </url>
{%- endfor %}
</urlset>
"#;

const OG_IMAGE_TEMPLATE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="1200" height="630" viewBox="0 0 1200 630">
  <defs>
    <linearGradient id="bg" x1="0" y1="0" x2="1" y2="1">
      <stop offset="0%" stop-color="#0f172a"/>
      <stop offset="100%" stop-color="#1e3a8a"/>
    </linearGradient>
  </defs>
  <rect width="1200" height="630" fill="url(#bg)"/>
  <rect x="80" y="96" width="96" height="8" rx="4" fill="#f59e0b"/>
  <text x="80" y="170" font-family="Inter, Arial, sans-serif" font-size="30" fill="#cbd5e1">{{ site_name | escape_xml }}</text>
  <text x="80" y="270" font-family="Inter, Arial, sans-serif" font-size="64" font-weight="700" fill="#ffffff">
    {%- for line in title_lines %}
    <tspan x="80" dy="{% if loop.first %}0{% else %}78{% endif %}">{{ line | escape_xml }}</tspan>
    {%- endfor %}
  </text>
  {%- if subtitle %}
  <text x="80" y="560" font-family="Inter, Arial, sans-serif" font-size="32" fill="#e2e8f0">{{ subtitle | escape_xml }}</text>
  {%- endif %}
</svg>
"##;

/// Compile every template
pub fn build() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_templates(vec![
        (SITEMAP, SITEMAP_TEMPLATE),
        (OG_IMAGE, OG_IMAGE_TEMPLATE),
    ])?;
    Ok(tera)
}
