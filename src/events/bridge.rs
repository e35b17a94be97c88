//! Event-bus window polling
//!
//! Fallback ingestion path for buses that cannot push to the webhook: a
//! background loop polls an injected [`EventBusSource`] for events published
//! since the last successful poll per connector and feeds them through the
//! ingestion pipeline. The window base lives in worker memory; after a
//! restart polling re-bases at startup time, which is safe because merge is
//! idempotent and delivery is at-least-once.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{EventError, EventIngestor};
use crate::config::EventBusConfig;
use crate::discovery::source::RemoteError;
use crate::models::connector::{self, TYPE_OBJECT_STORE};
use crate::store::CatalogStore;

/// Upstream event bus abstraction: everything published for one connector's
/// sources inside a time window, as raw envelopes.
#[async_trait]
pub trait EventBusSource: Send + Sync {
    async fn events_since(
        &self,
        connector: &connector::Model,
        since: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<JsonValue>, RemoteError>;
}

pub struct EventBusWorker {
    config: EventBusConfig,
    store: Arc<dyn CatalogStore>,
    ingestor: Arc<EventIngestor>,
    source: Arc<dyn EventBusSource>,
    last_poll: HashMap<Uuid, DateTime<Utc>>,
}

impl EventBusWorker {
    pub fn new(
        config: EventBusConfig,
        store: Arc<dyn CatalogStore>,
        ingestor: Arc<EventIngestor>,
        source: Arc<dyn EventBusSource>,
    ) -> Self {
        Self {
            config,
            store,
            ingestor,
            source,
            last_poll: HashMap::new(),
        }
    }

    /// Run the polling loop until the shutdown token fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            tick_seconds = self.config.tick_seconds,
            "Starting event-bus polling worker"
        );
        let tick_interval = TokioDuration::from_secs(self.config.tick_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Event-bus polling worker shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    self.tick().await;
                }
            }
        }

        info!("Event-bus polling worker stopped");
    }

    pub async fn tick(&mut self) {
        self.tick_at(Utc::now()).await;
    }

    /// One polling pass over every event-bus-enabled connector. A failure
    /// for one connector never blocks the others.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) {
        let connectors = match self.store.load_connectors().await {
            Ok(connectors) => connectors,
            Err(err) => {
                error!(error = %err, "Event-bus tick failed to load connectors");
                return;
            }
        };

        for connector in connectors
            .iter()
            .filter(|c| c.enabled && c.connector_type == TYPE_OBJECT_STORE)
            .filter(|c| c.discovery_config().event_bus)
        {
            self.poll_connector(connector, now).await;
        }
    }

    async fn poll_connector(&mut self, connector: &connector::Model, now: DateTime<Utc>) {
        let since = self.last_poll.get(&connector.id).copied();
        let events = match self.source.events_since(connector, since, now).await {
            Ok(events) => events,
            Err(err) => {
                warn!(
                    connector_id = %connector.id,
                    error = %err,
                    "Event-bus poll failed; window will be retried"
                );
                return;
            }
        };

        debug!(
            connector_id = %connector.id,
            events = events.len(),
            since = ?since,
            "Polled event-bus window"
        );

        let mut window_complete = true;
        for envelope in &events {
            match self.ingestor.ingest(envelope).await {
                Ok(_) => {}
                // Bad payloads and orphaned containers are the sender's
                // problem; they must not wedge the window.
                Err(EventError::Malformed { details }) => {
                    warn!(connector_id = %connector.id, details, "Dropped malformed bus event");
                }
                Err(EventError::UnknownTarget { container }) => {
                    warn!(
                        connector_id = %connector.id,
                        container,
                        "Dropped bus event for unowned container"
                    );
                }
                Err(EventError::Forwarding { details }) => {
                    error!(
                        connector_id = %connector.id,
                        details,
                        "Failed to apply bus event; window kept for replay"
                    );
                    window_complete = false;
                }
            }
        }

        if window_complete {
            self.last_poll.insert(connector.id, now);
        }
    }
}
