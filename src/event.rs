//! Storage change notifications.
//!
//! The Lambda payload is [`aws_lambda_events::event::s3::S3Event`].
//! [`ChangeEvent`] is what the reconciler consumes: the still-encoded key plus
//! a classified [`ChangeEventKind`].

use aws_lambda_events::event::s3::{S3Event, S3EventRecord};

const CREATED_PREFIX: &str = "ObjectCreated";
const REMOVED_PREFIX: &str = "ObjectRemoved";

/// What a change event asks us to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEventKind {
    /// `ObjectCreated:*`: create or update the document.
    Created,
    /// `ObjectRemoved:*`: delete the document if it exists.
    Removed,
    /// Anything else (restores, replication, lifecycle...). Ignored.
    Other,
}

impl ChangeEventKind {
    pub fn classify(label: &str) -> Self {
        if label.starts_with(CREATED_PREFIX) {
            ChangeEventKind::Created
        } else if label.starts_with(REMOVED_PREFIX) {
            ChangeEventKind::Removed
        } else {
            ChangeEventKind::Other
        }
    }
}

/// A single object creation or removal notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Object key exactly as it appeared in the notification.
    pub encoded_key: String,
    /// Event name as delivered, e.g. `ObjectCreated:Put`.
    pub label: String,
    pub kind: ChangeEventKind,
}

impl ChangeEvent {
    pub fn new(encoded_key: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        let kind = ChangeEventKind::classify(&label);
        Self {
            encoded_key: encoded_key.into(),
            label,
            kind,
        }
    }
}

impl From<&S3EventRecord> for ChangeEvent {
    fn from(record: &S3EventRecord) -> Self {
        ChangeEvent::new(
            record.s3.object.key.clone().unwrap_or_default(),
            record.event_name.clone().unwrap_or_default(),
        )
    }
}

/// Change events in delivery order.
pub fn change_events(notification: &S3Event) -> Vec<ChangeEvent> {
    notification.records.iter().map(ChangeEvent::from).collect()
}

/// Notification record JSON in the shape the bucket delivers it.
#[cfg(test)]
pub(crate) fn record_json(event_name: &str, key: &str) -> String {
    format!(
        r#"{{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "awsRegion": "eu-west-1",
            "eventTime": "2024-05-01T12:00:00.000Z",
            "eventName": "{event_name}",
            "userIdentity": {{ "principalId": "AWS:EXAMPLE" }},
            "requestParameters": {{ "sourceIPAddress": "127.0.0.1" }},
            "responseElements": {{ "x-amz-request-id": "C3D13FE58DE4C810" }},
            "s3": {{
                "s3SchemaVersion": "1.0",
                "configurationId": "sync",
                "bucket": {{
                    "name": "team-docs",
                    "ownerIdentity": {{ "principalId": "EXAMPLE" }},
                    "arn": "arn:aws:s3:::team-docs"
                }},
                "object": {{ "key": "{key}", "size": 1024, "eTag": "d41d8cd9", "sequencer": "0A1B2C3D4E5F678901" }}
            }}
        }}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notification_records_in_order() {
        let payload = format!(
            r#"{{"Records":[{},{}]}}"#,
            record_json("ObjectCreated:Put", "handbook/On+call+guide.pdf"),
            record_json("ObjectRemoved:Delete", "old%20notes.txt"),
        );
        let event: S3Event = serde_json::from_str(&payload).unwrap();
        let changes = change_events(&event);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].encoded_key, "handbook/On+call+guide.pdf");
        assert_eq!(changes[0].kind, ChangeEventKind::Created);
        assert_eq!(event.records[0].s3.bucket.name.as_deref(), Some("team-docs"));
        assert_eq!(changes[1].encoded_key, "old%20notes.txt");
        assert_eq!(changes[1].kind, ChangeEventKind::Removed);
    }

    #[test]
    fn classification_is_by_prefix() {
        assert_eq!(
            ChangeEventKind::classify("ObjectCreated:CompleteMultipartUpload"),
            ChangeEventKind::Created
        );
        assert_eq!(
            ChangeEventKind::classify("ObjectRemoved:DeleteMarkerCreated"),
            ChangeEventKind::Removed
        );
        assert_eq!(
            ChangeEventKind::classify("ObjectRestore:Completed"),
            ChangeEventKind::Other
        );
        assert_eq!(ChangeEventKind::classify(""), ChangeEventKind::Other);
    }

    #[test]
    fn record_without_name_or_key_is_ignored() {
        let payload = format!(r#"{{"Records":[{}]}}"#, record_json("ObjectCreated:Put", "a.txt"));
        let mut event: S3Event = serde_json::from_str(&payload).unwrap();
        event.records[0].event_name = None;
        event.records[0].s3.object.key = None;

        let changes = change_events(&event);
        assert_eq!(changes[0].kind, ChangeEventKind::Other);
        assert_eq!(changes[0].encoded_key, "");
    }

    #[test]
    fn empty_batch_has_no_changes() {
        let event: S3Event = serde_json::from_str(r#"{"Records":[]}"#).unwrap();
        assert!(change_events(&event).is_empty());
    }
}
