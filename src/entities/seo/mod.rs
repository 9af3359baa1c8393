//! SEO settings entity module

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::SeoDescriptor;
pub use handlers::*;
pub use model::{PageSeo, SeoInput, SeoSetting};
