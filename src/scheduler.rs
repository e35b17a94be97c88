//! # Discovery Scheduler
//!
//! Background task that evaluates every enabled connector each tick, runs
//! discovery plus reconciliation for the ones whose rediscovery interval has
//! elapsed, and isolates failures per connector. A failed pass deliberately
//! leaves `last_run` unadvanced so the connector is re-attempted on the next
//! tick instead of waiting a full interval.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge, histogram};
use thiserror::Error;
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::discovery::DiscoveryError;
use crate::discovery::registry::{AdapterRegistry, RegistryError};
use crate::models::connector;
use crate::notify::DownstreamNotifier;
use crate::reconcile::{ReconcileEngine, ReconcileSummary};
use crate::repositories::ConnectorDiscoveryConfig;
use crate::store::{CatalogStore, StoreError};

/// Error from one connector's discovery run. Caught at the scheduler
/// boundary; never propagates past the tick.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Adapter(#[from] DiscoveryError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-tick accounting, logged at debug level and exported as metrics.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub connectors_polled: u64,
    pub skipped_disabled: u64,
    pub skipped_not_due: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub assets_discovered: u64,
    pub assets_new: u64,
}

/// Background discovery scheduler service.
pub struct DiscoveryScheduler {
    config: SchedulerConfig,
    store: Arc<dyn CatalogStore>,
    registry: Arc<AdapterRegistry>,
    engine: ReconcileEngine,
    notifier: Arc<dyn DownstreamNotifier>,
}

impl DiscoveryScheduler {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn CatalogStore>,
        registry: Arc<AdapterRegistry>,
        engine: ReconcileEngine,
        notifier: Arc<dyn DownstreamNotifier>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            engine,
            notifier,
        }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_seconds = self.config.tick_seconds,
            "Starting discovery scheduler"
        );
        let tick_interval = TokioDuration::from_secs(self.config.tick_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Discovery scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    // One bad tick (e.g. the store briefly unreachable) must
                    // not kill scheduling for all connectors.
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "Scheduler tick failed");
                    }
                    let elapsed = tick_started.elapsed();
                    histogram!("discovery_scheduler_tick_duration_ms")
                        .record(elapsed.as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Discovery scheduler stopped");
    }

    /// Execute one scheduler tick against the current clock.
    pub async fn tick(&self) -> Result<TickStats, StoreError> {
        self.tick_at(Utc::now()).await
    }

    /// Execute one scheduler tick against an explicit clock (tests drive
    /// this directly so no real time has to pass).
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickStats, StoreError> {
        let connectors = self.store.load_connectors().await?;
        let mut stats = TickStats::default();

        for connector in &connectors {
            if !connector.enabled {
                stats.skipped_disabled += 1;
                continue;
            }
            stats.connectors_polled += 1;

            let config = connector.discovery_config();
            let last_run = connector.last_run.map(|dt| dt.with_timezone(&Utc));
            if !is_due(last_run, config.rediscovery_interval_minutes, now) {
                stats.skipped_not_due += 1;
                debug!(
                    connector_id = %connector.id,
                    interval_minutes = config.rediscovery_interval_minutes,
                    "Connector not yet due for rediscovery"
                );
                continue;
            }

            match self.run_connector(connector, &config, now).await {
                Ok(summary) => {
                    stats.runs_succeeded += 1;
                    stats.assets_discovered += summary.discovered as u64;
                    stats.assets_new += summary.new_assets.len() as u64;

                    if !summary.new_assets.is_empty() {
                        let notified = self
                            .notifier
                            .notify_new_assets(&connector.name, connector.id, &summary.new_assets)
                            .await;
                        if !notified {
                            warn!(
                                connector_id = %connector.id,
                                "Downstream notification failed; catalog write stands"
                            );
                        }
                    }
                }
                Err(err) => {
                    stats.runs_failed += 1;
                    // last_run is not advanced here, so the next tick
                    // re-attempts immediately.
                    error!(
                        connector_id = %connector.id,
                        connector_name = %connector.name,
                        error = %err,
                        "Discovery failed; connector will be re-attempted next tick"
                    );
                    if let Err(status_err) =
                        self.store.set_connector_status(connector.id, "error").await
                    {
                        error!(
                            connector_id = %connector.id,
                            error = %status_err,
                            "Failed to record connector error status"
                        );
                    }
                }
            }
        }

        gauge!("discovery_scheduler_connectors_polled").set(stats.connectors_polled as f64);
        counter!("discovery_scheduler_runs_succeeded_total").increment(stats.runs_succeeded);
        counter!("discovery_scheduler_runs_failed_total").increment(stats.runs_failed);

        debug!(
            polled = stats.connectors_polled,
            skipped_disabled = stats.skipped_disabled,
            skipped_not_due = stats.skipped_not_due,
            succeeded = stats.runs_succeeded,
            failed = stats.runs_failed,
            new_assets = stats.assets_new,
            "Scheduler tick completed"
        );

        Ok(stats)
    }

    /// One connector's discovery pass: adapter dispatch, then full
    /// reconciliation (which advances the checkpoint on success). Also used
    /// by the one-shot CLI, which bypasses the due check.
    #[instrument(skip_all, fields(connector_id = %connector.id, connector_type = %connector.connector_type))]
    pub async fn run_connector(
        &self,
        connector: &connector::Model,
        config: &ConnectorDiscoveryConfig,
        now: DateTime<Utc>,
    ) -> Result<ReconcileSummary, RunError> {
        let adapter = self.registry.get(&connector.connector_type)?;
        let discovery = adapter.discover(config).await?;

        if !discovery.failures.is_empty() {
            warn!(
                connector_id = %connector.id,
                failed_containers = discovery.failures.len(),
                "Discovery completed with partial container failures"
            );
        }

        let summary = self
            .engine
            .reconcile_full(connector, &discovery, now)
            .await?;
        Ok(summary)
    }
}

/// Whether a connector is due for rediscovery. A connector that has never
/// run is immediately due; otherwise elapsed time is compared against the
/// configured interval with an inclusive boundary.
pub fn is_due(last_run: Option<DateTime<Utc>>, interval_minutes: u64, now: DateTime<Utc>) -> bool {
    match last_run {
        None => true,
        Some(last_run) => now - last_run >= Duration::minutes(interval_minutes as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, second).unwrap()
    }

    #[test]
    fn never_run_is_always_due() {
        assert!(is_due(None, 5, at(0, 0)));
        assert!(is_due(None, 10_000, at(0, 0)));
    }

    #[test]
    fn boundary_is_inclusive() {
        let last_run = at(0, 0);
        // exactly 5.0 minutes elapsed
        assert!(is_due(Some(last_run), 5, at(5, 0)));
        // 4 minutes 59 seconds elapsed
        assert!(!is_due(Some(last_run), 5, at(4, 59)));
        assert!(is_due(Some(last_run), 5, at(6, 30)));
    }

    #[test]
    fn interval_is_per_connector() {
        let last_run = at(0, 0);
        assert!(is_due(Some(last_run), 1, at(1, 0)));
        assert!(!is_due(Some(last_run), 30, at(5, 0)));
    }
}
