//! High-level pipeline: keeps a knowledge-base dataset in step with a bucket.
//!
//! One invocation handles one notification batch:
//!   1. probe the document API ([`probe`])
//!   2. find or create the bucket's dataset ([`crate::dataset::resolve_or_create`])
//!   3. snapshot the dataset's documents ([`crate::index::load_all`])
//!   4. reconcile each event against that snapshot ([`Reconciler`])
//!
//! Steps 1-3 are pre-flight: if one fails nothing else happens and the
//! invocation fails. Step 4 isolates failures per event; a failed event is
//! logged and reported, and the batch carries on.
//!
//! Events are handled one at a time in batch order, and every call of one
//! event completes before the next starts.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`], or [`handle_batch`] for the
//!   status-code view the Lambda handler returns.
//! - Supporting types: [`SyncReport`], [`EventOutcome`], [`InvocationResult`].

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::SyncConfig;
use crate::contract::{DocumentStore, FileUpload, ObjectStore, UploadOptions};
use crate::error::{EventError, FatalError};
use crate::event::{ChangeEvent, ChangeEventKind};
use crate::index::DocumentIndex;
use crate::key_codec;

/// Page size of the connectivity probe listing.
pub const PROBE_PAGE_SIZE: u32 = 1;

pub const SUCCESS_MESSAGE: &str = "Sync completed successfully!";

/// What happened to one change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Created { name: String, document_id: String },
    Updated { name: String, document_id: String },
    Deleted { name: String, document_id: String },
    /// Removal of an object that never had a document. Nothing to do.
    AlreadyAbsent { name: String },
    /// Event kind we do not act on.
    Ignored { label: String },
    Failed { key: String, reason: String },
}

/// Per-event outcomes of one invocation, in batch order.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub dataset_id: String,
    pub outcomes: Vec<EventOutcome>,
}

impl SyncReport {
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    EventOutcome::Created { .. }
                        | EventOutcome::Updated { .. }
                        | EventOutcome::Deleted { .. }
                )
            })
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EventOutcome::Failed { .. }))
            .count()
    }

    pub fn skip_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    EventOutcome::AlreadyAbsent { .. } | EventOutcome::Ignored { .. }
                )
            })
            .count()
    }
}

/// Invocation response: `{"statusCode": 200|500, "body": "<JSON string>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResult {
    pub fn success() -> Self {
        Self::with_message(200, SUCCESS_MESSAGE)
    }

    pub fn failure(err: &FatalError) -> Self {
        Self::with_message(500, &format!("Error during sync: {err}"))
    }

    fn with_message(status_code: u16, message: &str) -> Self {
        // A JSON string literal; serialising a &str cannot fail.
        let body = serde_json::to_string(message).unwrap_or_else(|_| format!("\"{message}\""));
        Self { status_code, body }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// The human-readable message carried in `body`.
    pub fn message(&self) -> String {
        serde_json::from_str(&self.body).unwrap_or_else(|_| self.body.clone())
    }
}

/// Check that the document API answers at all. Any error means unreachable;
/// the error itself is only logged.
pub async fn probe<S>(store: &S) -> bool
where
    S: DocumentStore + ?Sized,
{
    match store.list_datasets(1, PROBE_PAGE_SIZE).await {
        Ok(_) => {
            info!("API connectivity test successful");
            true
        }
        Err(e) => {
            error!(error = %e, "API connectivity test failed");
            false
        }
    }
}

/// Applies change events to one dataset, using a fixed document snapshot.
pub struct Reconciler<'a, S: ?Sized, O: ?Sized> {
    store: &'a S,
    objects: &'a O,
    bucket: &'a str,
    dataset_id: &'a str,
    index: &'a DocumentIndex,
    options: UploadOptions,
}

impl<'a, S, O> Reconciler<'a, S, O>
where
    S: DocumentStore + ?Sized,
    O: ObjectStore + ?Sized,
{
    pub fn new(
        store: &'a S,
        objects: &'a O,
        bucket: &'a str,
        dataset_id: &'a str,
        index: &'a DocumentIndex,
    ) -> Self {
        Self {
            store,
            objects,
            bucket,
            dataset_id,
            index,
            options: UploadOptions::default(),
        }
    }

    /// Process every event in order. Never fails: per-event errors end up as
    /// [`EventOutcome::Failed`].
    pub async fn reconcile(&self, events: &[ChangeEvent]) -> Vec<EventOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            let span = info_span!("event", event_name = %event.label, encoded_key = %event.encoded_key);
            let outcome = match self.reconcile_event(event).instrument(span).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let object_key = key_codec::decode(&event.encoded_key)
                        .unwrap_or_else(|_| event.encoded_key.clone());
                    error!(
                        object_key = %object_key,
                        encoded_key = %event.encoded_key,
                        event_name = %event.label,
                        error = %e,
                        "Error processing object"
                    );
                    if let EventError::Store(store_err) = &e {
                        if let Some(body) = store_err.api_body() {
                            error!(object_key = %object_key, body, "Error response from document API");
                        }
                    }
                    EventOutcome::Failed {
                        key: event.encoded_key.clone(),
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn reconcile_event(&self, event: &ChangeEvent) -> Result<EventOutcome, EventError> {
        match event.kind {
            ChangeEventKind::Created => self.upsert(self.decode(event)?).await,
            ChangeEventKind::Removed => self.remove(self.decode(event)?).await,
            ChangeEventKind::Other => {
                debug!(event_name = %event.label, "Ignoring event kind");
                Ok(EventOutcome::Ignored {
                    label: event.label.clone(),
                })
            }
        }
    }

    fn decode(&self, event: &ChangeEvent) -> Result<String, EventError> {
        let name = key_codec::decode(&event.encoded_key)?;
        info!(
            object_key = %name,
            encoded_key = %event.encoded_key,
            event_name = %event.label,
            "Processing object"
        );
        Ok(name)
    }

    async fn upsert(&self, name: String) -> Result<EventOutcome, EventError> {
        debug!(object_key = %name, bucket = self.bucket, "Downloading object");
        let bytes = self.objects.get_object(self.bucket, &name).await?;
        info!(object_key = %name, size = bytes.len(), "Object downloaded, uploading document");

        let upload = FileUpload {
            filename: name.clone(),
            bytes,
            options: self.options.clone(),
        };

        match self.index.get(&name) {
            Some(existing) => {
                info!(object_key = %name, document_id = %existing.id, "Updating existing document");
                let document = self
                    .store
                    .update_document_by_file(self.dataset_id, &existing.id, upload)
                    .await?;
                Ok(EventOutcome::Updated {
                    name,
                    document_id: document.id,
                })
            }
            None => {
                info!(object_key = %name, "Creating new document");
                let document = self
                    .store
                    .create_document_by_file(self.dataset_id, upload)
                    .await?;
                Ok(EventOutcome::Created {
                    name,
                    document_id: document.id,
                })
            }
        }
    }

    async fn remove(&self, name: String) -> Result<EventOutcome, EventError> {
        let Some(existing) = self.index.get(&name) else {
            info!(object_key = %name, "Document not found, no deletion needed");
            return Ok(EventOutcome::AlreadyAbsent { name });
        };

        info!(object_key = %name, document_id = %existing.id, "Deleting document");
        self.store
            .delete_document(self.dataset_id, &existing.id)
            .await?;
        Ok(EventOutcome::Deleted {
            name,
            document_id: existing.id.clone(),
        })
    }
}

/// Run the full pipeline for one batch.
///
/// Returns `Err` only for pre-flight failures, in which case no event has been
/// touched. Per-event failures are in the returned report.
pub async fn synchronise<S, O>(
    config: &SyncConfig,
    store: &S,
    objects: &O,
    events: &[ChangeEvent],
) -> Result<SyncReport, FatalError>
where
    S: DocumentStore + ?Sized,
    O: ObjectStore + ?Sized,
{
    info!(
        api_base_url = config.api_base_url(),
        bucket = config.bucket(),
        event_count = events.len(),
        "Starting bucket sync"
    );

    if !probe(store).await {
        return Err(FatalError::ApiUnreachable);
    }

    let dataset = crate::dataset::resolve_or_create(store, config.bucket())
        .await
        .map_err(|source| FatalError::DatasetResolution {
            namespace: config.bucket().to_string(),
            source,
        })?;

    let index = crate::index::load_all(store, &dataset.id)
        .await
        .map_err(|source| FatalError::IndexLoad {
            dataset_id: dataset.id.clone(),
            source,
        })?;

    let reconciler = Reconciler::new(store, objects, config.bucket(), &dataset.id, &index);
    let outcomes = reconciler.reconcile(events).await;

    let report = SyncReport {
        dataset_id: dataset.id,
        outcomes,
    };
    if report.failure_count() > 0 {
        warn!(
            failure_count = report.failure_count(),
            "Some events failed; see errors above"
        );
    }
    info!(
        success_count = report.success_count(),
        failure_count = report.failure_count(),
        skip_count = report.skip_count(),
        "Sync completed"
    );
    Ok(report)
}

/// [`synchronise`] folded into the invocation response.
pub async fn handle_batch<S, O>(
    config: &SyncConfig,
    store: &S,
    objects: &O,
    events: &[ChangeEvent],
) -> (InvocationResult, Option<SyncReport>)
where
    S: DocumentStore + ?Sized,
    O: ObjectStore + ?Sized,
{
    match synchronise(config, store, objects, events).await {
        Ok(report) => (InvocationResult::success(), Some(report)),
        Err(e) => {
            error!(error = %e, "Error during sync");
            (InvocationResult::failure(&e), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{DocumentRecord, MockDocumentStore, MockObjectStore};
    use crate::error::{ObjectStoreError, StoreError};

    fn doc(id: &str, name: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn invocation_result_bodies_are_json_strings() {
        let ok = InvocationResult::success();
        assert_eq!(ok.status_code, 200);
        assert_eq!(ok.body, "\"Sync completed successfully!\"");
        assert_eq!(ok.message(), SUCCESS_MESSAGE);

        let failed = InvocationResult::failure(&FatalError::ApiUnreachable);
        assert_eq!(failed.status_code, 500);
        assert!(failed.message().starts_with("Error during sync: Unable to connect"));
        assert!(!failed.is_success());
    }

    #[test]
    fn invocation_result_serialises_with_lambda_field_names() {
        let json = serde_json::to_value(InvocationResult::success()).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], "\"Sync completed successfully!\"");
    }

    #[test]
    fn report_counts() {
        let report = SyncReport {
            dataset_id: "ds".into(),
            outcomes: vec![
                EventOutcome::Created {
                    name: "a".into(),
                    document_id: "1".into(),
                },
                EventOutcome::Deleted {
                    name: "b".into(),
                    document_id: "2".into(),
                },
                EventOutcome::AlreadyAbsent { name: "c".into() },
                EventOutcome::Ignored {
                    label: "ObjectRestore:Post".into(),
                },
                EventOutcome::Failed {
                    key: "d".into(),
                    reason: "x".into(),
                },
            ],
        };
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.skip_count(), 2);
        assert_eq!(report.failure_count(), 1);
    }

    #[tokio::test]
    async fn probe_reports_failure_as_false() {
        let mut store = MockDocumentStore::new();
        store
            .expect_list_datasets()
            .withf(|page, limit| *page == 1 && *limit == PROBE_PAGE_SIZE)
            .returning(|_, _| Err(StoreError::Transport("dns".into())));
        assert!(!probe(&store).await);
    }

    #[tokio::test]
    async fn decoded_key_is_used_for_fetch_and_filename() {
        let mut store = MockDocumentStore::new();
        let mut objects = MockObjectStore::new();
        objects
            .expect_get_object()
            .withf(|bucket: &str, key: &str| bucket == "team-docs" && key == "On call guide.pdf")
            .times(1)
            .returning(|_, _| Ok(b"%PDF".to_vec()));
        store
            .expect_create_document_by_file()
            .withf(|ds: &str, upload: &FileUpload| {
                ds == "ds-1"
                    && upload.filename == "On call guide.pdf"
                    && upload.bytes == b"%PDF"
                    && upload.options == UploadOptions::default()
            })
            .times(1)
            .returning(|_, upload| Ok(doc("new-doc", &upload.filename)));

        let index = DocumentIndex::default();
        let reconciler = Reconciler::new(&store, &objects, "team-docs", "ds-1", &index);
        let outcomes = reconciler
            .reconcile(&[ChangeEvent::new("On+call+guide.pdf", "ObjectCreated:Put")])
            .await;

        assert_eq!(
            outcomes,
            vec![EventOutcome::Created {
                name: "On call guide.pdf".into(),
                document_id: "new-doc".into(),
            }]
        );
    }

    #[tokio::test]
    async fn fetch_failure_skips_the_store() {
        let mut store = MockDocumentStore::new();
        let mut objects = MockObjectStore::new();
        objects.expect_get_object().returning(|bucket, key| {
            Err(ObjectStoreError::Fetch {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "NoSuchKey".into(),
            })
        });
        store.expect_create_document_by_file().never();
        store.expect_update_document_by_file().never();

        let index = DocumentIndex::from_records(vec![doc("d1", "gone.txt")]);
        let reconciler = Reconciler::new(&store, &objects, "b", "ds-1", &index);
        let outcomes = reconciler
            .reconcile(&[ChangeEvent::new("gone.txt", "ObjectCreated:Copy")])
            .await;

        match &outcomes[0] {
            EventOutcome::Failed { key, reason } => {
                assert_eq!(key, "gone.txt");
                assert!(reason.contains("NoSuchKey"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_key_fails_only_that_event() {
        let store = MockDocumentStore::new();
        let objects = MockObjectStore::new();
        let index = DocumentIndex::default();
        let reconciler = Reconciler::new(&store, &objects, "b", "ds-1", &index);

        let outcomes = reconciler
            .reconcile(&[
                ChangeEvent::new("bad%FF", "ObjectRemoved:Delete"),
                ChangeEvent::new("fine.txt", "ObjectRemoved:Delete"),
            ])
            .await;

        assert!(matches!(outcomes[0], EventOutcome::Failed { .. }));
        assert_eq!(
            outcomes[1],
            EventOutcome::AlreadyAbsent {
                name: "fine.txt".into()
            }
        );
    }

    #[tokio::test]
    async fn malformed_escape_fails_the_event_without_touching_the_store() {
        let mut store = MockDocumentStore::new();
        store.expect_delete_document().never();
        let mut objects = MockObjectStore::new();
        objects
            .expect_get_object()
            .withf(|_, key: &str| key == "next.txt")
            .times(1)
            .returning(|_, _| Err(ObjectStoreError::Fetch {
                bucket: "b".into(),
                key: "next.txt".into(),
                message: "NoSuchKey".into(),
            }));
        let index = DocumentIndex::from_records(vec![doc("d1", "100%zz")]);
        let reconciler = Reconciler::new(&store, &objects, "b", "ds-1", &index);

        let outcomes = reconciler
            .reconcile(&[
                ChangeEvent::new("100%zz", "ObjectRemoved:Delete"),
                ChangeEvent::new("next.txt", "ObjectCreated:Put"),
            ])
            .await;

        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            EventOutcome::Failed { key, reason } => {
                assert_eq!(key, "100%zz");
                assert!(reason.contains("malformed percent escape"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(matches!(outcomes[1], EventOutcome::Failed { ref key, .. } if key == "next.txt"));
    }
}
