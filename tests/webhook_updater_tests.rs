//! Webhook self-healing loop tests: registration happens exactly when the
//! observed public URL changes, failures are retried on the next tick, and
//! an absent tunnel is a quiet no-op. The ngrok-style introspection client
//! is exercised against a wiremock agent API.

mod test_utils;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalogd::config::WebhookUpdaterConfig;
use catalogd::store::DbCatalogStore;
use catalogd::webhook_updater::{
    NgrokIntrospection, Registration, RegistrarError, SubscriptionRegistrar, TunnelIntrospection,
    WebhookUpdater,
};

/// Tunnel fake whose observed URL the test can swap between ticks.
#[derive(Default)]
struct FakeTunnel {
    url: Mutex<Option<Url>>,
}

impl FakeTunnel {
    fn set(&self, url: Option<&str>) {
        *self.url.lock().unwrap() = url.map(|u| Url::parse(u).unwrap());
    }
}

#[async_trait]
impl TunnelIntrospection for FakeTunnel {
    async fn current_public_url(&self) -> Option<Url> {
        self.url.lock().unwrap().clone()
    }
}

/// Registrar fake recording every call; can be switched to fail.
#[derive(Default)]
struct FakeRegistrar {
    calls: Mutex<Vec<(Uuid, Url)>>,
    fail: Mutex<bool>,
}

#[async_trait]
impl SubscriptionRegistrar for FakeRegistrar {
    async fn register_callback(
        &self,
        connector_id: Uuid,
        callback: &Url,
    ) -> Result<Registration, RegistrarError> {
        self.calls
            .lock()
            .unwrap()
            .push((connector_id, callback.clone()));
        if *self.fail.lock().unwrap() {
            return Err(RegistrarError::Unavailable("simulated outage".to_string()));
        }
        Ok(Registration {
            success: true,
            configured_scopes: vec!["landing".to_string()],
        })
    }
}

fn updater_config() -> WebhookUpdaterConfig {
    WebhookUpdaterConfig {
        enabled: true,
        tick_seconds: 30,
        tunnel_api_url: "http://127.0.0.1:4040/api/tunnels".to_string(),
        registrar_url: Some("https://upstream.example.com/subscriptions".to_string()),
        callback_path: "/api/events".to_string(),
        connector_id: None,
        connector_type: "object-store".to_string(),
    }
}

async fn updater_harness() -> (WebhookUpdater, Arc<FakeTunnel>, Arc<FakeRegistrar>, Uuid) {
    let db = test_utils::setup_db().await;
    let connector = test_utils::insert_connector(
        &db,
        "landing",
        "object-store",
        true,
        json!({ "account_name": "acct", "containers": ["landing"] }),
    )
    .await;

    let store = Arc::new(DbCatalogStore::new(Arc::new(db)));
    let tunnel = Arc::new(FakeTunnel::default());
    let registrar = Arc::new(FakeRegistrar::default());
    let updater = WebhookUpdater::new(
        updater_config(),
        store,
        tunnel.clone(),
        registrar.clone(),
    );
    (updater, tunnel, registrar, connector.id)
}

#[tokio::test]
async fn unchanged_url_registers_at_most_once() {
    let (mut updater, tunnel, registrar, connector_id) = updater_harness().await;

    tunnel.set(Some("https://abc.tunnel.example"));
    updater.tick().await;
    updater.tick().await;

    let calls = registrar.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, connector_id);
    assert_eq!(
        calls[0].1.as_str(),
        "https://abc.tunnel.example/api/events"
    );
}

#[tokio::test]
async fn changed_url_triggers_exactly_one_new_registration() {
    let (mut updater, tunnel, registrar, _) = updater_harness().await;

    tunnel.set(Some("https://abc.tunnel.example"));
    updater.tick().await;
    updater.tick().await;

    tunnel.set(Some("https://def.tunnel.example"));
    updater.tick().await;

    let calls = registrar.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1].1.as_str(),
        "https://def.tunnel.example/api/events"
    );
}

#[tokio::test]
async fn failed_registration_is_retried_next_tick() {
    let (mut updater, tunnel, registrar, _) = updater_harness().await;

    tunnel.set(Some("https://abc.tunnel.example"));
    *registrar.fail.lock().unwrap() = true;
    updater.tick().await;
    assert_eq!(registrar.calls.lock().unwrap().len(), 1);

    // The failed URL was not remembered, so the same URL is retried.
    *registrar.fail.lock().unwrap() = false;
    updater.tick().await;
    assert_eq!(registrar.calls.lock().unwrap().len(), 2);

    // And once it succeeds, no further calls for the same URL.
    updater.tick().await;
    assert_eq!(registrar.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn absent_tunnel_is_a_quiet_no_op() {
    let (mut updater, tunnel, registrar, _) = updater_harness().await;

    updater.tick().await;
    updater.tick().await;
    assert!(registrar.calls.lock().unwrap().is_empty());

    // Tunnel appears, registers, then dies; rediscovery re-registers even
    // though the URL is the same as before the outage.
    tunnel.set(Some("https://abc.tunnel.example"));
    updater.tick().await;
    tunnel.set(None);
    updater.tick().await;
    tunnel.set(Some("https://abc.tunnel.example"));
    updater.tick().await;

    assert_eq!(registrar.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn ngrok_introspection_prefers_https_tunnels() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tunnels": [
                { "proto": "http", "public_url": "http://abc.tunnel.example" },
                { "proto": "https", "public_url": "https://abc.tunnel.example" },
            ]
        })))
        .mount(&server)
        .await;

    let endpoint = Url::parse(&format!("{}/api/tunnels", server.uri())).unwrap();
    let introspection = NgrokIntrospection::new(endpoint);
    let url = introspection.current_public_url().await.unwrap();
    assert_eq!(url.as_str(), "https://abc.tunnel.example/");
}

#[tokio::test]
async fn ngrok_introspection_treats_errors_as_absent() {
    // Nothing listening on this port.
    let endpoint = Url::parse("http://127.0.0.1:1/api/tunnels").unwrap();
    let introspection = NgrokIntrospection::new(endpoint);
    assert!(introspection.current_public_url().await.is_none());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tunnels": [] })))
        .mount(&server)
        .await;
    let endpoint = Url::parse(&format!("{}/api/tunnels", server.uri())).unwrap();
    let introspection = NgrokIntrospection::new(endpoint);
    assert!(introspection.current_public_url().await.is_none());
}
