//! Catalog snapshot files.

use helios_core::InMemoryCatalog;
use std::path::Path;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

/// Reads a JSON catalog snapshot from disk.
///
/// Rules that fail validation are kept and logged; only unreadable files and
/// malformed JSON are errors.
pub fn load_catalog_snapshot(path: impl AsRef<Path>) -> ServiceResult<InMemoryCatalog> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ServiceError::SnapshotRead {
        path: path.to_path_buf(),
        source,
    })?;

    let catalog = InMemoryCatalog::from_json(&contents)?;
    info!(?path, rules = catalog.len(), "Catalog snapshot loaded");
    Ok(catalog)
}
