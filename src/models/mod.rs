//! # Data Models
//!
//! This module contains the SeaORM entities for the catalog tables.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod asset;
pub mod connector;
pub mod pending_asset;

pub use asset::Entity as Asset;
pub use connector::Entity as Connector;
pub use pending_asset::Entity as PendingAsset;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "catalogd".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
