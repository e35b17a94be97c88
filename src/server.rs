//! # Server Configuration
//!
//! Builds the Axum application, wires the discovery engine components, and
//! spawns the background loops (scheduler, webhook updater) under a shared
//! cancellation token so shutdown is graceful: each loop finishes its
//! current iteration before exiting.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::discovery::AdapterRegistry;
use crate::events::EventIngestor;
use crate::handlers;
use crate::notify::{DownstreamNotifier, LogNotifier, WebhookNotifier};
use crate::reconcile::ReconcileEngine;
use crate::scheduler::DiscoveryScheduler;
use crate::store::DbCatalogStore;
use crate::webhook_updater::{HttpRegistrar, NgrokIntrospection, WebhookUpdater};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub ingestor: Arc<EventIngestor>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/api/events", post(handlers::events::ingest_event))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server and background loops with the given configuration.
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(DbCatalogStore::new(Arc::new(db.clone())));
    let engine = ReconcileEngine::new(store.clone());

    // Remote source gateways are supplied by embedders; the stock binary
    // covers file-system connectors out of the box.
    let registry = Arc::new(AdapterRegistry::initialize(None));

    let notifier: Arc<dyn DownstreamNotifier> = match &config.notifier.webhook_url {
        Some(raw) => match Url::parse(raw) {
            Ok(endpoint) => Arc::new(WebhookNotifier::new(endpoint, &config.notifier)),
            Err(err) => {
                warn!(url = %raw, error = %err, "Invalid notifier URL; falling back to log notifier");
                Arc::new(LogNotifier)
            }
        },
        None => Arc::new(LogNotifier),
    };

    let ingestor = Arc::new(EventIngestor::new(
        store.clone(),
        engine.clone(),
        notifier.clone(),
    ));

    let shutdown = CancellationToken::new();

    let scheduler = DiscoveryScheduler::new(
        config.scheduler.clone(),
        store.clone(),
        registry,
        engine,
        notifier,
    );
    tokio::spawn(scheduler.run(shutdown.child_token()));

    if config.webhook_updater.enabled {
        match &config.webhook_updater.registrar_url {
            Some(raw) => match (Url::parse(raw), Url::parse(&config.webhook_updater.tunnel_api_url))
            {
                (Ok(registrar_url), Ok(tunnel_url)) => {
                    let updater = WebhookUpdater::new(
                        config.webhook_updater.clone(),
                        store.clone(),
                        Arc::new(NgrokIntrospection::new(tunnel_url)),
                        Arc::new(HttpRegistrar::new(registrar_url)),
                    );
                    tokio::spawn(updater.run(shutdown.child_token()));
                }
                (registrar, tunnel) => {
                    warn!(
                        registrar_ok = registrar.is_ok(),
                        tunnel_ok = tunnel.is_ok(),
                        "Webhook updater not started: invalid URL configuration"
                    );
                }
            },
            None => {
                info!("Webhook updater not started: no registrar URL configured");
            }
        }
    }

    if config.event_bus.enabled {
        // The bus worker needs an EventBusSource implementation, which is an
        // upstream capability embedders supply; the stock binary has none.
        warn!("Event-bus polling is enabled but no bus source is built in; worker not started");
    }

    let state = AppState { db, ingestor };
    let app = create_app(state);

    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, profile = %config.profile, "Server listening");

    let shutdown_signal = {
        let shutdown = shutdown.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received; stopping background loops");
            shutdown.cancel();
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::events::ingest_event,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::handlers::events::EventAcceptedResponse,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Catalogd API",
        description = "Asset discovery and catalog synchronization service",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
