//! # Downstream Notification
//!
//! Best-effort fan-out of newly created assets to a downstream consumer.
//! Failures are logged, never raised: a notification miss must not roll back
//! the catalog write that triggered it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::NotifierConfig;
use crate::reconcile::AssetSummary;

#[async_trait]
pub trait DownstreamNotifier: Send + Sync {
    /// Deliver the list of newly created assets for one connector. Returns
    /// whether delivery succeeded; callers only log the outcome.
    async fn notify_new_assets(
        &self,
        connector_name: &str,
        connector_id: Uuid,
        assets: &[AssetSummary],
    ) -> bool;
}

/// Notifier that posts a JSON summary to a configured webhook endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: Url,
    max_retries: u32,
}

impl WebhookNotifier {
    pub fn new(endpoint: Url, config: &NotifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint,
            max_retries: config.max_retries.max(1),
        }
    }

    /// Endpoints must be HTTPS except for loopback hosts (local consumers).
    pub fn endpoint_allowed(endpoint: &Url) -> bool {
        if endpoint.scheme() == "https" {
            return true;
        }
        endpoint.scheme() == "http"
            && matches!(endpoint.host_str(), Some("localhost") | Some("127.0.0.1"))
    }

    fn build_payload(
        connector_name: &str,
        connector_id: Uuid,
        assets: &[AssetSummary],
    ) -> serde_json::Value {
        json!({
            "connector_id": connector_id,
            "connector_name": connector_name,
            "new_assets": assets,
            "count": assets.len(),
        })
    }
}

#[async_trait]
impl DownstreamNotifier for WebhookNotifier {
    async fn notify_new_assets(
        &self,
        connector_name: &str,
        connector_id: Uuid,
        assets: &[AssetSummary],
    ) -> bool {
        if assets.is_empty() {
            return true;
        }
        if !Self::endpoint_allowed(&self.endpoint) {
            warn!(
                endpoint = %self.endpoint,
                "Refusing to notify non-HTTPS downstream endpoint"
            );
            return false;
        }

        let payload = Self::build_payload(connector_name, connector_id, assets);

        for attempt in 1..=self.max_retries {
            match self
                .client
                .post(self.endpoint.clone())
                .json(&payload)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    info!(
                        connector_id = %connector_id,
                        new_assets = assets.len(),
                        attempt,
                        "Notified downstream of new assets"
                    );
                    return true;
                }
                Ok(response) => {
                    warn!(
                        connector_id = %connector_id,
                        status = %response.status(),
                        attempt,
                        "Downstream notification rejected"
                    );
                }
                Err(err) => {
                    warn!(
                        connector_id = %connector_id,
                        error = %err,
                        attempt,
                        "Downstream notification failed"
                    );
                }
            }
        }

        false
    }
}

/// Fallback notifier used when no downstream endpoint is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl DownstreamNotifier for LogNotifier {
    async fn notify_new_assets(
        &self,
        connector_name: &str,
        connector_id: Uuid,
        assets: &[AssetSummary],
    ) -> bool {
        info!(
            connector_id = %connector_id,
            connector_name = %connector_name,
            new_assets = assets.len(),
            "New assets discovered (no downstream endpoint configured)"
        );
        true
    }
}
