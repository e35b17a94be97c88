//! # Reconciliation Engine
//!
//! Merges freshly discovered descriptors into the persisted catalog for one
//! connector: membership is computed by asset id against that connector's
//! slice only, upserts are idempotent and per-row, and full listings soft
//! delete entries that vanished. Incremental (event-driven) passes never
//! compute removals; they see only a partial slice of the source.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::discovery::{AssetDescriptor, Discovery};
use crate::models::asset::{self, STATUS_REMOVED};
use crate::models::connector;
use crate::repositories::NewAsset;
use crate::store::{CatalogStore, StoreError};

/// Compact asset identity forwarded to downstream notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub id: String,
    pub name: String,
    pub asset_type: String,
    pub catalog: String,
}

impl AssetSummary {
    pub fn from_descriptor(descriptor: &AssetDescriptor) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            asset_type: descriptor.kind.as_str().to_string(),
            catalog: descriptor.catalog.clone(),
        }
    }
}

/// Membership split of one discovered batch against the catalog snapshot.
#[derive(Debug, Default)]
pub struct Diff {
    pub new: Vec<AssetDescriptor>,
    pub changed: Vec<AssetDescriptor>,
    pub unchanged: Vec<AssetDescriptor>,
}

/// Outcome of one full reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileSummary {
    /// Descriptors in the batch after in-batch dedup.
    pub discovered: usize,
    /// Assets inserted for the first time, in upsert order.
    pub new_assets: Vec<AssetSummary>,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// Rows written successfully (inserts plus updates).
    pub saved: usize,
    /// Per-row failures that were logged and skipped.
    pub failed: usize,
}

/// One incremental change derived from a push notification.
#[derive(Debug, Clone)]
pub enum IncrementalChange {
    Upsert(AssetDescriptor),
    Remove { asset_id: String },
}

#[derive(Debug, Default)]
pub struct IncrementalOutcome {
    /// A new catalog row was created.
    pub inserted: bool,
    /// An existing row was soft-deleted.
    pub removed: bool,
}

#[derive(Clone)]
pub struct ReconcileEngine {
    store: Arc<dyn CatalogStore>,
}

impl ReconcileEngine {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Collapse duplicate ids within one batch; the later occurrence wins.
    pub fn dedup_batch(descriptors: Vec<AssetDescriptor>) -> Vec<AssetDescriptor> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut deduped: Vec<AssetDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match index.get(&descriptor.id) {
                Some(&slot) => deduped[slot] = descriptor,
                None => {
                    index.insert(descriptor.id.clone(), deduped.len());
                    deduped.push(descriptor);
                }
            }
        }
        deduped
    }

    /// Split a deduped batch into new/changed/unchanged against the
    /// connector's current catalog snapshot.
    pub fn diff(
        discovered: &[AssetDescriptor],
        existing: &HashMap<String, asset::Model>,
    ) -> Diff {
        let mut diff = Diff::default();
        for descriptor in discovered {
            match existing.get(&descriptor.id) {
                None => diff.new.push(descriptor.clone()),
                Some(current) if descriptor_differs(descriptor, current) => {
                    diff.changed.push(descriptor.clone());
                }
                Some(_) => diff.unchanged.push(descriptor.clone()),
            }
        }
        diff
    }

    /// Full-listing reconciliation for one connector: upsert new/changed
    /// rows, soft delete rows absent from the listing, then advance the
    /// connector's scheduling checkpoint.
    pub async fn reconcile_full(
        &self,
        connector: &connector::Model,
        discovery: &Discovery,
        now: DateTime<Utc>,
    ) -> Result<ReconcileSummary, StoreError> {
        let existing = self.store.load_assets(Some(connector.id)).await?;
        let existing_by_id: HashMap<String, asset::Model> = existing
            .iter()
            .map(|model| (model.id.clone(), model.clone()))
            .collect();

        let deduped = Self::dedup_batch(discovery.assets.clone());
        let discovered_ids: HashSet<&str> = deduped.iter().map(|d| d.id.as_str()).collect();
        let diff = Self::diff(&deduped, &existing_by_id);

        let mut summary = ReconcileSummary {
            discovered: deduped.len(),
            unchanged: diff.unchanged.len(),
            ..ReconcileSummary::default()
        };

        for descriptor in diff.new.iter().chain(diff.changed.iter()) {
            let record = NewAsset {
                descriptor: descriptor.clone(),
                connector_id: connector.id,
                observed_at: now,
            };
            match self.store.upsert_asset(&record).await {
                Ok(inserted) => {
                    summary.saved += 1;
                    if inserted {
                        summary.new_assets.push(AssetSummary::from_descriptor(descriptor));
                    } else {
                        summary.updated += 1;
                    }
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(
                        asset_id = %descriptor.id,
                        connector_id = %connector.id,
                        error = %err,
                        "Failed to upsert asset; continuing with the batch"
                    );
                    counter!("catalog_asset_upsert_failures_total").increment(1);
                }
            }
        }

        for stale in existing
            .iter()
            .filter(|model| model.status != STATUS_REMOVED)
            .filter(|model| !discovered_ids.contains(model.id.as_str()))
        {
            match self.store.mark_asset_removed(&stale.id, now).await {
                Ok(_) => summary.removed += 1,
                Err(err) => {
                    summary.failed += 1;
                    warn!(
                        asset_id = %stale.id,
                        connector_id = %connector.id,
                        error = %err,
                        "Failed to soft delete vanished asset"
                    );
                }
            }
        }

        let assets_count = self.store.count_assets(connector.id).await?;
        self.store
            .update_connector_checkpoint(connector.id, now, assets_count)
            .await?;

        counter!("catalog_assets_new_total").increment(summary.new_assets.len() as u64);
        counter!("catalog_assets_removed_total").increment(summary.removed as u64);

        info!(
            connector_id = %connector.id,
            connector_name = %connector.name,
            discovered = summary.discovered,
            new = summary.new_assets.len(),
            updated = summary.updated,
            unchanged = summary.unchanged,
            removed = summary.removed,
            failed = summary.failed,
            "Reconciliation pass completed"
        );

        Ok(summary)
    }

    /// Incremental reconciliation of one change. Does not advance the
    /// connector checkpoint, so scheduled full listings (and their removal
    /// detection) keep their cadence under steady event flow.
    pub async fn reconcile_event(
        &self,
        connector_id: Uuid,
        change: &IncrementalChange,
        now: DateTime<Utc>,
    ) -> Result<IncrementalOutcome, StoreError> {
        match change {
            IncrementalChange::Upsert(descriptor) => {
                let record = NewAsset {
                    descriptor: descriptor.clone(),
                    connector_id,
                    observed_at: now,
                };
                let inserted = self.store.upsert_asset(&record).await?;
                Ok(IncrementalOutcome {
                    inserted,
                    removed: false,
                })
            }
            IncrementalChange::Remove { asset_id } => {
                let removed = self.store.mark_asset_removed(asset_id, now).await?;
                Ok(IncrementalOutcome {
                    inserted: false,
                    removed,
                })
            }
        }
    }
}

fn descriptor_differs(descriptor: &AssetDescriptor, current: &asset::Model) -> bool {
    current.status == STATUS_REMOVED
        || current.name != descriptor.name
        || current.asset_type != descriptor.kind.as_str()
        || current.catalog != descriptor.catalog
        || current.schema_path != descriptor.schema_path
        || current.size_bytes != descriptor.size_bytes
        || current.last_modified.with_timezone(&Utc) != descriptor.last_modified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::AssetKind;
    use chrono::TimeZone;

    fn descriptor(id: &str, size: i64) -> AssetDescriptor {
        AssetDescriptor {
            id: id.to_string(),
            name: "x.csv".to_string(),
            kind: AssetKind::DataFile,
            catalog: "bucket".to_string(),
            schema_path: "/".to_string(),
            size_bytes: size,
            last_modified: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            source: "Object Store".to_string(),
        }
    }

    fn model_for(descriptor: &AssetDescriptor, status: &str) -> asset::Model {
        asset::Model {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            asset_type: descriptor.kind.as_str().to_string(),
            catalog: descriptor.catalog.clone(),
            schema_path: descriptor.schema_path.clone(),
            size_bytes: descriptor.size_bytes,
            last_modified: descriptor.last_modified.into(),
            connector_id: Uuid::new_v4(),
            status: status.to_string(),
            discovered_at: descriptor.last_modified.into(),
            metadata: None,
            updated_at: descriptor.last_modified.into(),
        }
    }

    #[test]
    fn later_duplicate_wins_within_a_batch() {
        let batch = vec![descriptor("obs://a/b/x.csv", 1), descriptor("obs://a/b/x.csv", 2)];
        let deduped = ReconcileEngine::dedup_batch(batch);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].size_bytes, 2);
    }

    #[test]
    fn diff_splits_new_changed_unchanged() {
        let seen = descriptor("obs://a/b/seen.csv", 10);
        let grown = descriptor("obs://a/b/grown.csv", 10);
        let fresh = descriptor("obs://a/b/fresh.csv", 10);

        let mut existing = HashMap::new();
        existing.insert(seen.id.clone(), model_for(&seen, "active"));
        let mut stale = model_for(&grown, "active");
        stale.size_bytes = 5;
        existing.insert(grown.id.clone(), stale);

        let diff = ReconcileEngine::diff(&[seen, grown, fresh], &existing);
        assert_eq!(diff.new.len(), 1);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.unchanged.len(), 1);
        assert_eq!(diff.new[0].id, "obs://a/b/fresh.csv");
        assert_eq!(diff.changed[0].id, "obs://a/b/grown.csv");
    }

    #[test]
    fn soft_deleted_asset_counts_as_changed_when_reseen() {
        let revived = descriptor("obs://a/b/back.csv", 10);
        let mut existing = HashMap::new();
        existing.insert(revived.id.clone(), model_for(&revived, STATUS_REMOVED));

        let diff = ReconcileEngine::diff(std::slice::from_ref(&revived), &existing);
        assert_eq!(diff.changed.len(), 1);
        assert!(diff.new.is_empty());
        assert!(diff.unchanged.is_empty());
    }
}
