//! Bulk import orchestration with per-record partial-failure accounting.
//!
//! Records are processed strictly one at a time, in input order: resolve
//! images, build the persistence payload, attempt the write. A failed write
//! is recorded and the batch moves on: a 500-row import with 3 bad rows
//! still yields 497 listings plus a precise failure report.

use crate::image_resolver::ImageResolver;
use crate::property::{FailedImport, ImportResult, ParsedProperty, PropertyRecord};
use crate::store::PropertyStore;
use tracing::{info, warn};

/// Import an already-validated batch. Never fails as a whole; the returned
/// [`ImportResult`] accounts for every input record exactly once.
pub async fn import_properties(
    store: &dyn PropertyStore,
    resolver: &ImageResolver,
    properties: Vec<ParsedProperty>,
) -> ImportResult {
    let mut result = ImportResult {
        total: properties.len(),
        ..Default::default()
    };

    info!("Starting bulk import of {} properties", result.total);

    for property in properties {
        // Image resolution degrades internally; by the time we get the list
        // back every position holds either a local path or the original URL.
        let images = resolver.process_property_images(&property.images).await;

        let title = property.title.clone();
        let record = PropertyRecord::from_parsed(property, images);

        match store.create(record).await {
            Ok(id) => {
                info!("Imported '{}' as {}", title, id);
                result.success.push(id);
            }
            Err(e) => {
                warn!("Failed to import '{}': {:#}", title, e);
                result.failed.push(FailedImport {
                    property: title,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    info!(
        "Import run complete: {} total, {} imported, {} failed",
        result.total,
        result.success.len(),
        result.failed.len()
    );

    result
}
