//! Name-keyed view of a dataset's documents.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::contract::{DocumentRecord, DocumentStore};
use crate::error::StoreError;

/// Documents requested per listing page.
pub const DOCUMENT_PAGE_SIZE: u32 = 100;

/// Snapshot of a dataset's documents, keyed by document name.
///
/// Built once per invocation before any event is processed and not updated
/// afterwards: events of the same batch do not see each other's effects.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    by_name: HashMap<String, DocumentRecord>,
}

impl DocumentIndex {
    /// Build an index from records in listing order. A later record with the
    /// same name replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = DocumentRecord>) -> Self {
        let mut by_name = HashMap::new();
        for record in records {
            by_name.insert(record.name.clone(), record);
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&DocumentRecord> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Fetch every document of `dataset_id`, across all pages.
pub async fn load_all<S>(store: &S, dataset_id: &str) -> Result<DocumentIndex, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let mut records = Vec::new();
    let mut page = 1;
    loop {
        let listing = store
            .list_documents(dataset_id, page, DOCUMENT_PAGE_SIZE)
            .await?;
        debug!(
            dataset_id,
            page,
            count = listing.items.len(),
            has_more = listing.has_more,
            "Listed documents"
        );
        records.extend(listing.items);
        if !listing.has_more {
            break;
        }
        page += 1;
    }

    info!(
        dataset_id,
        count = records.len(),
        "Found existing documents in the dataset"
    );
    Ok(DocumentIndex::from_records(records))
}
