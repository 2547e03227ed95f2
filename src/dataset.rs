//! Dataset discovery.
//!
//! The dataset for a bucket is looked up by name on every invocation. Nothing
//! is cached between invocations, so the first invocation that misses creates
//! it and every later one finds it.

use tracing::{debug, info};

use crate::contract::{Dataset, DocumentStore};
use crate::error::StoreError;

/// Datasets requested per listing page.
pub const DATASET_PAGE_SIZE: u32 = 20;

/// Find the dataset named `namespace`, or create it.
///
/// Pages through every dataset until a name matches or the store reports no
/// further pages. The first match in page order wins; duplicates are left
/// alone. Any failed call is returned as is.
pub async fn resolve_or_create<S>(store: &S, namespace: &str) -> Result<Dataset, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let mut page = 1;
    loop {
        let listing = store.list_datasets(page, DATASET_PAGE_SIZE).await?;
        debug!(
            page,
            count = listing.items.len(),
            has_more = listing.has_more,
            "Listed datasets"
        );

        if let Some(found) = listing.items.into_iter().find(|d| d.name == namespace) {
            info!(dataset_id = %found.id, namespace, "Found existing dataset");
            return Ok(found);
        }

        if !listing.has_more {
            break;
        }
        page += 1;
    }

    info!(namespace, "Dataset not found, creating new one");
    let created = store.create_dataset(namespace).await?;
    info!(dataset_id = %created.id, namespace, "Created new dataset");
    Ok(created)
}
