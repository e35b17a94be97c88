//! Typed read-view over the connector's opaque `config` JSON.
//!
//! Connectors are created by an external management surface, so the config
//! blob is treated as untrusted input: every field is optional, alternate
//! camelCase spellings are accepted, and malformed values fall back to
//! defaults rather than failing the connector outright.

use serde_json::Value as JsonValue;

use crate::models::connector;

/// Default minimum minutes between scheduled discovery passes.
pub const DEFAULT_REDISCOVERY_INTERVAL_MINUTES: u64 = 5;

#[derive(Debug, Clone, Default)]
pub struct ConnectorDiscoveryConfig {
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub connection_string: Option<String>,
    /// Pin discovery to one container instead of enumerating them all.
    pub container_name: Option<String>,
    /// Pin discovery to one file share instead of enumerating them all.
    pub share_name: Option<String>,
    /// Root directory for file-system connectors.
    pub root_path: Option<String>,
    /// Minimum minutes between scheduled discovery passes.
    pub rediscovery_interval_minutes: u64,
    /// Containers this connector receives change events for.
    pub containers: Vec<String>,
    /// Whether the event-bus polling worker should cover this connector.
    pub event_bus: bool,
}

impl ConnectorDiscoveryConfig {
    pub fn from_config(config: Option<&JsonValue>) -> Self {
        let Some(config) = config else {
            return Self::default_with_interval();
        };

        let string_field = |names: &[&str]| -> Option<String> {
            names
                .iter()
                .find_map(|name| config.get(name))
                .and_then(JsonValue::as_str)
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty())
        };

        let interval = config
            .get("rediscovery_interval_minutes")
            .and_then(JsonValue::as_u64)
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_REDISCOVERY_INTERVAL_MINUTES);

        let containers = config
            .get("containers")
            .or_else(|| config.get("configured_buckets"))
            .and_then(JsonValue::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            account_name: string_field(&["account_name", "accountName"]),
            account_key: string_field(&["account_key", "accountKey"]),
            connection_string: string_field(&["connection_string", "connectionString"]),
            container_name: string_field(&["container_name", "containerName"]),
            share_name: string_field(&["share_name", "shareName"]),
            root_path: string_field(&["root_path", "rootPath"]),
            rediscovery_interval_minutes: interval,
            containers,
            event_bus: config
                .get("event_bus")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
        }
    }

    fn default_with_interval() -> Self {
        Self {
            rediscovery_interval_minutes: DEFAULT_REDISCOVERY_INTERVAL_MINUTES,
            ..Self::default()
        }
    }

    /// Whether an inbound change event for `container` targets this
    /// connector: either it is listed explicitly, or it matches the
    /// single-container scope.
    pub fn matches_container(&self, container: &str) -> bool {
        self.containers.iter().any(|name| name == container)
            || self.container_name.as_deref() == Some(container)
    }
}

impl connector::Model {
    /// Typed view over this connector's opaque config blob.
    pub fn discovery_config(&self) -> ConnectorDiscoveryConfig {
        ConnectorDiscoveryConfig::from_config(self.config.as_ref())
    }
}
