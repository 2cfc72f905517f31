//! Input catalog loading.

mod discovery;
mod loader;
mod models;

pub use discovery::{pick_default_input, LEGACY_FILENAME};
pub use loader::{load_catalog, parse_catalog, Catalog, CatalogError, CatalogFormat};
pub use models::{id_from_url, source_url_for, CatalogRecord, DEFAULT_TITLE};
