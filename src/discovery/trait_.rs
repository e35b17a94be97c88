//! Discovery adapter trait definition
//!
//! Defines the interface every source-kind adapter implements. Adapters are
//! read-only against the remote source; they produce descriptors and leave
//! catalog writes to the reconciliation engine.

use async_trait::async_trait;

use super::{Discovery, DiscoveryError};
use crate::repositories::connector_config::ConnectorDiscoveryConfig;

#[async_trait]
pub trait DiscoveryAdapter: Send + Sync {
    /// Enumerate the source described by `config` into descriptors.
    ///
    /// Failures enumerating a single container are recorded in the returned
    /// [`Discovery::failures`] and do not abort the call; only account-level
    /// failures (bad credentials, unreachable service) surface as errors.
    async fn discover(&self, config: &ConnectorDiscoveryConfig)
    -> Result<Discovery, DiscoveryError>;
}
