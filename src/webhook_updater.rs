//! # Webhook Self-Healing Loop
//!
//! Background task that watches the externally reachable callback URL of
//! this process (a local tunnel whose public address can rotate) and keeps
//! it registered with the upstream notification service so push events keep
//! flowing. Registration state is owned by the loop; a process restart
//! simply re-registers from scratch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::config::WebhookUpdaterConfig;
use crate::store::CatalogStore;

/// Result of an upstream subscription registration.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub success: bool,
    #[serde(default)]
    pub configured_scopes: Vec<String>,
}

#[derive(Debug, Clone, Error)]
pub enum RegistrarError {
    #[error("registrar unavailable: {0}")]
    Unavailable(String),
    #[error("registration rejected: {0}")]
    Rejected(String),
}

/// Observes the current externally reachable URL of this process. Absent is
/// a normal state (no tunnel running), not an error.
#[async_trait]
pub trait TunnelIntrospection: Send + Sync {
    async fn current_public_url(&self) -> Option<Url>;
}

/// Registers a callback URL with the upstream notification service.
#[async_trait]
pub trait SubscriptionRegistrar: Send + Sync {
    async fn register_callback(
        &self,
        connector_id: Uuid,
        callback: &Url,
    ) -> Result<Registration, RegistrarError>;
}

/// Tunnel introspection against an ngrok-style local agent API.
pub struct NgrokIntrospection {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct TunnelList {
    #[serde(default)]
    tunnels: Vec<Tunnel>,
}

#[derive(Debug, Deserialize)]
struct Tunnel {
    #[serde(default)]
    proto: String,
    public_url: String,
}

impl NgrokIntrospection {
    pub fn new(endpoint: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, endpoint }
    }
}

#[async_trait]
impl TunnelIntrospection for NgrokIntrospection {
    async fn current_public_url(&self) -> Option<Url> {
        let response = self.client.get(self.endpoint.clone()).send().await.ok()?;
        let list: TunnelList = response.json().await.ok()?;
        if list.tunnels.is_empty() {
            return None;
        }

        let chosen = list
            .tunnels
            .iter()
            .find(|tunnel| tunnel.proto == "https")
            .or_else(|| list.tunnels.first())?;
        Url::parse(&chosen.public_url).ok()
    }
}

/// Registrar posting to an upstream subscription endpoint.
pub struct HttpRegistrar {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRegistrar {
    pub fn new(endpoint: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, endpoint }
    }
}

#[async_trait]
impl SubscriptionRegistrar for HttpRegistrar {
    async fn register_callback(
        &self,
        connector_id: Uuid,
        callback: &Url,
    ) -> Result<Registration, RegistrarError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({
                "connector_id": connector_id,
                "callback_url": callback.as_str(),
            }))
            .send()
            .await
            .map_err(|err| RegistrarError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RegistrarError::Rejected(format!(
                "upstream returned status {}",
                response.status()
            )));
        }

        response
            .json::<Registration>()
            .await
            .map_err(|err| RegistrarError::Rejected(err.to_string()))
    }
}

/// Background webhook updater service.
pub struct WebhookUpdater {
    config: WebhookUpdaterConfig,
    store: Arc<dyn CatalogStore>,
    tunnel: Arc<dyn TunnelIntrospection>,
    registrar: Arc<dyn SubscriptionRegistrar>,
    /// The URL the upstream subscription currently points at; None until the
    /// first successful registration or after the tunnel disappears.
    last_registered: Option<Url>,
}

impl WebhookUpdater {
    pub fn new(
        config: WebhookUpdaterConfig,
        store: Arc<dyn CatalogStore>,
        tunnel: Arc<dyn TunnelIntrospection>,
        registrar: Arc<dyn SubscriptionRegistrar>,
    ) -> Self {
        Self {
            config,
            store,
            tunnel,
            registrar,
            last_registered: None,
        }
    }

    /// Run the self-healing loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            tick_seconds = self.config.tick_seconds,
            "Starting webhook updater"
        );
        let tick_interval = TokioDuration::from_secs(self.config.tick_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Webhook updater shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    self.tick().await;
                }
            }
        }

        info!("Webhook updater stopped");
    }

    /// One observe-and-heal pass.
    pub async fn tick(&mut self) {
        let Some(current) = self.tunnel.current_public_url().await else {
            // No tunnel is a normal state. Forget the old URL so a later
            // rediscovery is treated as a change and re-registered.
            if self.last_registered.take().is_some() {
                info!("Tunnel no longer reachable; cleared registered callback URL");
            }
            return;
        };

        if self.last_registered.as_ref() == Some(&current) {
            debug!(url = %current, "Callback URL unchanged");
            return;
        }

        match &self.last_registered {
            None => info!(url = %current, "Tunnel detected; registering callback"),
            Some(previous) => info!(
                old = %previous,
                new = %current,
                "Tunnel URL changed; re-registering callback"
            ),
        }

        let Some(connector_id) = self.resolve_target().await else {
            warn!("No connector available to register the callback for");
            return;
        };

        let callback = match current.join(&self.config.callback_path) {
            Ok(callback) => callback,
            Err(err) => {
                warn!(
                    url = %current,
                    path = %self.config.callback_path,
                    error = %err,
                    "Failed to build callback URL"
                );
                return;
            }
        };

        match self.registrar.register_callback(connector_id, &callback).await {
            Ok(registration) if registration.success => {
                info!(
                    connector_id = %connector_id,
                    callback = %callback,
                    scopes = ?registration.configured_scopes,
                    "Registered callback with upstream"
                );
                self.last_registered = Some(current);
            }
            Ok(_) => {
                // Not remembered: the next tick retries the same URL.
                warn!(
                    connector_id = %connector_id,
                    "Upstream reported registration failure; will retry next tick"
                );
            }
            Err(err) => {
                warn!(
                    connector_id = %connector_id,
                    error = %err,
                    "Callback registration failed; will retry next tick"
                );
            }
        }
    }

    /// The connector to register under: pinned by configuration, or the
    /// first enabled connector of the configured source kind.
    async fn resolve_target(&self) -> Option<Uuid> {
        if let Some(pinned) = self.config.connector_id {
            return Some(pinned);
        }

        match self
            .store
            .first_enabled_connector(&self.config.connector_type)
            .await
        {
            Ok(Some(connector)) => Some(connector.id),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "Failed to look up webhook target connector");
                None
            }
        }
    }
}
