//! # Event Ingestion Pipeline
//!
//! Converts push notifications (object-store change events, possibly wrapped
//! in a message-bus envelope) into incremental reconciliation without
//! waiting for the next scheduled poll. Each accepted event is staged as a
//! pending asset before reconciliation so a crash mid-processing leaves a
//! durable trail for replay.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::discovery::{
    AssetDescriptor, AssetKind, leaf_name, object_asset_id, object_store, schema_of,
};
use crate::discovery::source::SourceIdentity;
use crate::models::connector::TYPE_OBJECT_STORE;
use crate::notify::DownstreamNotifier;
use crate::reconcile::{AssetSummary, IncrementalChange, ReconcileEngine};
use crate::repositories::NewPendingAsset;
use crate::store::CatalogStore;

pub mod bridge;

/// Errors rejecting or failing one inbound event.
#[derive(Debug, Error)]
pub enum EventError {
    /// Bad payload: rejected, not retried by this component (retry is the
    /// sender's responsibility).
    #[error("malformed event: {details}")]
    Malformed { details: String },
    /// No enabled connector owns the event's container.
    #[error("no enabled connector owns container '{container}'")]
    UnknownTarget { container: String },
    /// The catalog write failed; the pending row is kept for replay.
    #[error("failed to forward event to the catalog: {details}")]
    Forwarding { details: String },
}

impl EventError {
    fn malformed<S: Into<String>>(details: S) -> Self {
        Self::Malformed {
            details: details.into(),
        }
    }

    fn forwarding<E: std::fmt::Display>(err: E) -> Self {
        Self::Forwarding {
            details: err.to_string(),
        }
    }
}

/// Change category derived from the source event type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Created,
    Updated,
    Removed,
}

impl ChangeType {
    pub fn from_event_type(event_type: &str) -> Self {
        let upper = event_type.to_ascii_uppercase();
        match upper.as_str() {
            "OBJECT_FINALIZE" | "OBJECT_ARCHIVE" => ChangeType::Created,
            "OBJECT_METADATA_UPDATE" => ChangeType::Updated,
            "OBJECT_DELETE" => ChangeType::Removed,
            _ if upper.starts_with("OBJECTCREATED") => ChangeType::Created,
            _ if upper.starts_with("OBJECTREMOVED") => ChangeType::Removed,
            _ => {
                debug!(event_type, "Unknown event type; treating as created");
                ChangeType::Created
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Created => "created",
            ChangeType::Updated => "updated",
            ChangeType::Removed => "removed",
        }
    }
}

/// One change notification after envelope decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub container: String,
    pub object_key: String,
    pub event_type: String,
    pub size_bytes: Option<i64>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Receipt for one accepted event.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub pending_id: String,
    pub connector_id: Uuid,
    pub change_type: ChangeType,
    pub asset_id: String,
}

/// Decode an inbound envelope into a change event.
///
/// Three envelope forms are accepted: the change payload itself, a
/// message-bus wrapper `{"message": {"data": "<base64 json>"}}`, and a bare
/// `{"data": "<base64 json>"}`.
pub fn decode_envelope(envelope: &JsonValue) -> Result<ChangeEvent, EventError> {
    let inner: JsonValue = if let Some(message) = envelope.get("message") {
        let data = message
            .get("data")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| EventError::malformed("message envelope missing data field"))?;
        decode_inner_payload(data)?
    } else if let Some(data) = envelope.get("data").and_then(JsonValue::as_str) {
        decode_inner_payload(data)?
    } else {
        envelope.clone()
    };

    let container = string_field(&inner, &["bucket", "container"])
        .ok_or_else(|| EventError::malformed("missing container identity"))?;
    let object_key = string_field(&inner, &["name", "key", "object"])
        .ok_or_else(|| EventError::malformed("missing object identifier"))?;
    let event_type =
        string_field(&inner, &["eventType", "event_type"]).unwrap_or_else(|| "OBJECT_FINALIZE".to_string());

    // Sources disagree on whether size is a number or a decimal string.
    let size_bytes = inner
        .get("size")
        .or_else(|| inner.get("sizeBytes"))
        .and_then(|value| value.as_i64().or_else(|| value.as_str()?.parse().ok()));

    let occurred_at = string_field(&inner, &["timeCreated", "time_created", "occurred_at"])
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(ChangeEvent {
        container,
        object_key,
        event_type,
        size_bytes,
        occurred_at,
    })
}

fn decode_inner_payload(data: &str) -> Result<JsonValue, EventError> {
    use base64::Engine as _;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|err| EventError::malformed(format!("inner payload is not base64: {err}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|err| EventError::malformed(format!("inner payload is not UTF-8: {err}")))?;
    serde_json::from_str(&text)
        .map_err(|err| EventError::malformed(format!("inner payload is not JSON: {err}")))
}

fn string_field(value: &JsonValue, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(name))
        .and_then(JsonValue::as_str)
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

fn pending_id(change: ChangeType, container: &str, object_key: &str, at: DateTime<Utc>) -> String {
    // Timestamp for readability, random suffix for uniqueness: repeated
    // events for the same object in the same second must not collide once
    // the earlier row is processed.
    let suffix = Uuid::new_v4().simple().to_string();
    let raw = format!(
        "pending_{}_{}_{}_{}_{}",
        change.as_str(),
        container,
        object_key.replace(['/', ' '], "_"),
        at.timestamp(),
        &suffix[..8]
    );
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':'))
        .take(255)
        .collect()
}

pub struct EventIngestor {
    store: Arc<dyn CatalogStore>,
    engine: ReconcileEngine,
    notifier: Arc<dyn DownstreamNotifier>,
}

impl EventIngestor {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        engine: ReconcileEngine,
        notifier: Arc<dyn DownstreamNotifier>,
    ) -> Self {
        Self {
            store,
            engine,
            notifier,
        }
    }

    /// Process one inbound envelope end to end: decode, resolve the owning
    /// connector, stage a pending asset, reconcile incrementally, mark the
    /// pending row processed, and notify downstream of inserts.
    pub async fn ingest(&self, envelope: &JsonValue) -> Result<IngestReceipt, EventError> {
        let now = Utc::now();
        let event = decode_envelope(envelope)?;
        let change = ChangeType::from_event_type(&event.event_type);

        let connectors = self
            .store
            .load_connectors()
            .await
            .map_err(EventError::forwarding)?;
        let connector = connectors
            .into_iter()
            .find(|c| {
                c.enabled
                    && c.connector_type == TYPE_OBJECT_STORE
                    && c.discovery_config().matches_container(&event.container)
            })
            .ok_or_else(|| EventError::UnknownTarget {
                container: event.container.clone(),
            })?;

        let config = connector.discovery_config();
        let identity = SourceIdentity::resolve(&config).map_err(|err| {
            EventError::forwarding(format!("connector {} misconfigured: {err}", connector.id))
        })?;

        let asset_id = object_asset_id(&identity.account, &event.container, &event.object_key);
        let kind = AssetKind::classify(&event.object_key);
        let descriptor = AssetDescriptor {
            id: asset_id.clone(),
            name: leaf_name(&event.object_key),
            kind,
            catalog: event.container.clone(),
            schema_path: schema_of(&event.object_key),
            size_bytes: event.size_bytes.unwrap_or(0),
            last_modified: event.occurred_at.unwrap_or(now),
            source: object_store::SOURCE_LABEL.to_string(),
        };

        let staged = NewPendingAsset {
            id: pending_id(change, &event.container, &event.object_key, now),
            name: descriptor.name.clone(),
            asset_type: kind.as_str().to_string(),
            catalog: event.container.clone(),
            connector_id: connector.id,
            change_type: change.as_str().to_string(),
            source_event_type: event.event_type.clone(),
            asset_id: asset_id.clone(),
            asset_data: match change {
                ChangeType::Removed => None,
                _ => serde_json::to_value(&descriptor).ok(),
            },
            received_at: now,
        };
        let pending_row = self
            .store
            .stage_pending_asset(&staged)
            .await
            .map_err(EventError::forwarding)?;

        let action = match change {
            ChangeType::Created | ChangeType::Updated => {
                IncrementalChange::Upsert(descriptor.clone())
            }
            ChangeType::Removed => IncrementalChange::Remove {
                asset_id: asset_id.clone(),
            },
        };
        let outcome = self
            .engine
            .reconcile_event(connector.id, &action, now)
            .await
            .map_err(EventError::forwarding)?;

        self.store
            .mark_pending_processed(&pending_row, now)
            .await
            .map_err(EventError::forwarding)?;

        if outcome.inserted {
            let notified = self
                .notifier
                .notify_new_assets(
                    &connector.name,
                    connector.id,
                    &[AssetSummary::from_descriptor(&descriptor)],
                )
                .await;
            if !notified {
                warn!(
                    connector_id = %connector.id,
                    asset_id = %asset_id,
                    "Downstream notification for event-driven asset failed"
                );
            }
        }

        counter!("event_ingest_accepted_total").increment(1);
        debug!(
            connector_id = %connector.id,
            asset_id = %asset_id,
            change_type = change.as_str(),
            "Processed change event"
        );

        Ok(IngestReceipt {
            pending_id: pending_row,
            connector_id: connector.id,
            change_type: change,
            asset_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use serde_json::json;

    #[test]
    fn decodes_direct_payload() {
        let envelope = json!({
            "bucket": "landing",
            "name": "2025/x.csv",
            "eventType": "OBJECT_FINALIZE",
            "size": "128",
            "timeCreated": "2025-03-01T10:00:00Z",
        });
        let event = decode_envelope(&envelope).unwrap();
        assert_eq!(event.container, "landing");
        assert_eq!(event.object_key, "2025/x.csv");
        assert_eq!(event.size_bytes, Some(128));
        assert!(event.occurred_at.is_some());
    }

    #[test]
    fn decodes_message_bus_envelope() {
        let inner = json!({ "bucket": "landing", "name": "x.csv", "eventType": "OBJECT_DELETE" });
        let data = base64::engine::general_purpose::STANDARD.encode(inner.to_string());
        let envelope = json!({ "message": { "data": data, "messageId": "1" } });

        let event = decode_envelope(&envelope).unwrap();
        assert_eq!(event.event_type, "OBJECT_DELETE");
        assert_eq!(event.container, "landing");
    }

    #[test]
    fn rejects_missing_fields_and_bad_base64() {
        let missing_object = json!({ "bucket": "landing", "eventType": "OBJECT_FINALIZE" });
        assert!(matches!(
            decode_envelope(&missing_object),
            Err(EventError::Malformed { .. })
        ));

        let missing_bucket = json!({ "name": "x.csv" });
        assert!(matches!(
            decode_envelope(&missing_bucket),
            Err(EventError::Malformed { .. })
        ));

        let bad_inner = json!({ "message": { "data": "not-base64!!!" } });
        assert!(matches!(
            decode_envelope(&bad_inner),
            Err(EventError::Malformed { .. })
        ));
    }

    #[test]
    fn event_types_map_to_change_types() {
        assert_eq!(
            ChangeType::from_event_type("OBJECT_FINALIZE"),
            ChangeType::Created
        );
        assert_eq!(
            ChangeType::from_event_type("OBJECT_METADATA_UPDATE"),
            ChangeType::Updated
        );
        assert_eq!(
            ChangeType::from_event_type("OBJECT_DELETE"),
            ChangeType::Removed
        );
        assert_eq!(
            ChangeType::from_event_type("ObjectCreated:Put"),
            ChangeType::Created
        );
        assert_eq!(
            ChangeType::from_event_type("ObjectRemoved:Delete"),
            ChangeType::Removed
        );
        assert_eq!(
            ChangeType::from_event_type("SomethingElse"),
            ChangeType::Created
        );
    }

    #[test]
    fn pending_ids_are_sanitized() {
        let at = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let id = pending_id(ChangeType::Created, "bucket", "dir with space/x.csv", at);
        assert!(id.starts_with("pending_created_bucket_dir_with_space_x"));
        let other = pending_id(ChangeType::Created, "bucket", "dir with space/x.csv", at);
        assert_ne!(id, other);
        assert!(id.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':')));
    }
}
