//! Event-bus polling worker tests: window advancement on clean passes and
//! window retention when a catalog write fails mid-window.

mod test_utils;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::EntityTrait;
use serde_json::{Value as JsonValue, json};

use catalogd::config::EventBusConfig;
use catalogd::discovery::source::RemoteError;
use catalogd::events::EventIngestor;
use catalogd::events::bridge::{EventBusSource, EventBusWorker};
use catalogd::models::asset::Entity as Asset;
use catalogd::models::connector;
use catalogd::notify::LogNotifier;
use catalogd::reconcile::ReconcileEngine;
use catalogd::store::DbCatalogStore;

/// Bus fake that records the requested windows and serves canned envelopes.
#[derive(Default)]
struct FakeBus {
    envelopes: Mutex<Vec<JsonValue>>,
    windows: Mutex<Vec<(Option<DateTime<Utc>>, DateTime<Utc>)>>,
    unavailable: Mutex<bool>,
}

#[async_trait]
impl EventBusSource for FakeBus {
    async fn events_since(
        &self,
        _connector: &connector::Model,
        since: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<JsonValue>, RemoteError> {
        if *self.unavailable.lock().unwrap() {
            return Err(RemoteError::Unavailable("bus down".to_string()));
        }
        self.windows.lock().unwrap().push((since, until));
        Ok(self.envelopes.lock().unwrap().clone())
    }
}

async fn worker_harness() -> (EventBusWorker, Arc<FakeBus>, sea_orm::DatabaseConnection) {
    let db = test_utils::setup_db().await;
    test_utils::insert_connector(
        &db,
        "landing",
        "object-store",
        true,
        json!({ "account_name": "acct", "containers": ["landing"], "event_bus": true }),
    )
    .await;

    let store = Arc::new(DbCatalogStore::new(Arc::new(db.clone())));
    let engine = ReconcileEngine::new(store.clone());
    let ingestor = Arc::new(EventIngestor::new(
        store.clone(),
        engine,
        Arc::new(LogNotifier),
    ));

    let bus = Arc::new(FakeBus::default());
    let worker = EventBusWorker::new(
        EventBusConfig {
            enabled: true,
            tick_seconds: 15,
        },
        store,
        ingestor,
        bus.clone(),
    );
    (worker, bus, db)
}

#[tokio::test]
async fn window_advances_from_last_successful_poll() {
    let (mut worker, bus, db) = worker_harness().await;
    bus.envelopes
        .lock()
        .unwrap()
        .push(json!({ "bucket": "landing", "name": "x.csv", "eventType": "OBJECT_FINALIZE" }));

    let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    worker.tick_at(t0).await;
    let t1 = t0 + Duration::seconds(15);
    worker.tick_at(t1).await;

    let windows = bus.windows.lock().unwrap().clone();
    assert_eq!(windows.len(), 2);
    // First poll has no base; the second starts where the first ended.
    assert_eq!(windows[0], (None, t0));
    assert_eq!(windows[1], (Some(t0), t1));

    // Replayed envelopes stay idempotent in the catalog.
    assert_eq!(Asset::find().all(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_poll_keeps_the_window_base() {
    let (mut worker, bus, _db) = worker_harness().await;

    let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    worker.tick_at(t0).await;

    *bus.unavailable.lock().unwrap() = true;
    let t1 = t0 + Duration::seconds(15);
    worker.tick_at(t1).await;

    *bus.unavailable.lock().unwrap() = false;
    let t2 = t0 + Duration::seconds(30);
    worker.tick_at(t2).await;

    let windows = bus.windows.lock().unwrap().clone();
    // The failed poll recorded no window; the recovery poll still bases on
    // the last successful one.
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[1], (Some(t0), t2));
}

#[tokio::test]
async fn malformed_bus_events_do_not_wedge_the_window() {
    let (mut worker, bus, db) = worker_harness().await;
    {
        let mut envelopes = bus.envelopes.lock().unwrap();
        envelopes.push(json!({ "bucket": "landing" }));
        envelopes.push(json!({ "bucket": "landing", "name": "ok.csv" }));
    }

    let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    worker.tick_at(t0).await;
    let t1 = t0 + Duration::seconds(15);
    worker.tick_at(t1).await;

    // Window advanced despite the malformed envelope, and the good event
    // landed.
    let windows = bus.windows.lock().unwrap().clone();
    assert_eq!(windows[1].0, Some(t0));
    assert_eq!(Asset::find().all(&db).await.unwrap().len(), 1);
}
