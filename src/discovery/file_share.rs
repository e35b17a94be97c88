//! File-share discovery adapter
//!
//! Walks hierarchical shares depth-first, synthesizing a Folder descriptor
//! per directory. A directory that fails to list is recorded and skipped;
//! the rest of the share still enumerates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use super::source::{RemoteEntry, SourceGateway, SourceIdentity};
use super::trait_::DiscoveryAdapter;
use super::{
    AssetDescriptor, AssetKind, ContainerSummary, Discovery, DiscoveryError, share_asset_id,
};
use crate::repositories::connector_config::ConnectorDiscoveryConfig;

pub const SOURCE_LABEL: &str = "File Share";

pub struct FileShareAdapter {
    gateway: Arc<dyn SourceGateway>,
}

impl FileShareAdapter {
    pub fn new(gateway: Arc<dyn SourceGateway>) -> Self {
        Self { gateway }
    }
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn schema_for_dir(dir: &str) -> String {
    if dir.is_empty() {
        "/".to_string()
    } else {
        dir.to_string()
    }
}

#[async_trait]
impl DiscoveryAdapter for FileShareAdapter {
    async fn discover(
        &self,
        config: &ConnectorDiscoveryConfig,
    ) -> Result<Discovery, DiscoveryError> {
        let identity = SourceIdentity::resolve(config)?;
        let client = self.gateway.file_share(&identity)?;

        let shares = match &config.share_name {
            Some(share) => vec![share.clone()],
            None => client
                .list_shares()
                .await
                .map_err(|err| DiscoveryError::remote_unavailable(err.to_string()))?,
        };

        let mut discovery = Discovery::default();
        for share in shares {
            let mut asset_count = 0;
            // Depth-first walk with an explicit stack; each frame is one
            // directory path relative to the share root.
            let mut stack: Vec<String> = vec![String::new()];

            while let Some(dir) = stack.pop() {
                let entries = match client.list_directory(&share, &dir).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        warn!(
                            share = %share,
                            directory = %dir,
                            error = %err,
                            "Skipping directory that failed to list"
                        );
                        discovery.record_failure(&join_path(&share, &dir), err);
                        continue;
                    }
                };

                for entry in entries {
                    match entry {
                        RemoteEntry::Directory { name } => {
                            let path = join_path(&dir, &name);
                            discovery.assets.push(AssetDescriptor {
                                id: share_asset_id(&identity.account, &share, &path),
                                name,
                                kind: AssetKind::Folder,
                                catalog: share.clone(),
                                schema_path: schema_for_dir(&dir),
                                size_bytes: 0,
                                last_modified: Utc::now(),
                                source: SOURCE_LABEL.to_string(),
                            });
                            asset_count += 1;
                            stack.push(path);
                        }
                        RemoteEntry::File {
                            name,
                            size_bytes,
                            last_modified,
                        } => {
                            let path = join_path(&dir, &name);
                            discovery.assets.push(AssetDescriptor {
                                id: share_asset_id(&identity.account, &share, &path),
                                kind: AssetKind::classify(&path),
                                name,
                                catalog: share.clone(),
                                schema_path: schema_for_dir(&dir),
                                size_bytes: size_bytes.unwrap_or(0),
                                last_modified: last_modified.unwrap_or_else(Utc::now),
                                source: SOURCE_LABEL.to_string(),
                            });
                            asset_count += 1;
                        }
                    }
                }
            }

            discovery.containers.push(ContainerSummary {
                name: share,
                asset_count,
            });
        }

        Ok(discovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::source::{
        FileShareClient, ObjectStoreClient, QueueServiceClient, RemoteError, TableServiceClient,
    };
    use serde_json::json;
    use std::collections::HashMap;

    struct FakeShares {
        shares: Vec<String>,
        // (share, dir) -> entries
        tree: HashMap<(String, String), Vec<RemoteEntry>>,
        broken_dirs: Vec<(String, String)>,
    }

    #[async_trait]
    impl FileShareClient for FakeShares {
        async fn list_shares(&self) -> Result<Vec<String>, RemoteError> {
            Ok(self.shares.clone())
        }

        async fn list_directory(
            &self,
            share: &str,
            path: &str,
        ) -> Result<Vec<RemoteEntry>, RemoteError> {
            let key = (share.to_string(), path.to_string());
            if self.broken_dirs.contains(&key) {
                return Err(RemoteError::Denied(format!("cannot list {share}/{path}")));
            }
            Ok(self.tree.get(&key).cloned().unwrap_or_default())
        }
    }

    struct ShareGateway {
        shares: Arc<FakeShares>,
    }

    impl SourceGateway for ShareGateway {
        fn object_store(
            &self,
            _identity: &SourceIdentity,
        ) -> Result<Arc<dyn ObjectStoreClient>, DiscoveryError> {
            Err(DiscoveryError::configuration("no object-store client"))
        }

        fn file_share(
            &self,
            _identity: &SourceIdentity,
        ) -> Result<Arc<dyn FileShareClient>, DiscoveryError> {
            Ok(self.shares.clone())
        }

        fn table_service(
            &self,
            _identity: &SourceIdentity,
        ) -> Result<Arc<dyn TableServiceClient>, DiscoveryError> {
            Err(DiscoveryError::configuration("no table client"))
        }

        fn queue_service(
            &self,
            _identity: &SourceIdentity,
        ) -> Result<Arc<dyn QueueServiceClient>, DiscoveryError> {
            Err(DiscoveryError::configuration("no queue client"))
        }
    }

    fn file(name: &str, size: i64) -> RemoteEntry {
        RemoteEntry::File {
            name: name.to_string(),
            size_bytes: Some(size),
            last_modified: None,
        }
    }

    fn dir(name: &str) -> RemoteEntry {
        RemoteEntry::Directory {
            name: name.to_string(),
        }
    }

    fn adapter_with(shares: FakeShares) -> FileShareAdapter {
        FileShareAdapter::new(Arc::new(ShareGateway {
            shares: Arc::new(shares),
        }))
    }

    fn config() -> ConnectorDiscoveryConfig {
        ConnectorDiscoveryConfig::from_config(Some(&json!({ "account_name": "acct" })))
    }

    #[tokio::test]
    async fn walks_directories_and_synthesizes_folders() {
        let adapter = adapter_with(FakeShares {
            shares: vec!["reports".into()],
            tree: HashMap::from([
                (
                    ("reports".to_string(), String::new()),
                    vec![dir("2025"), file("index.txt", 3)],
                ),
                (
                    ("reports".to_string(), "2025".to_string()),
                    vec![file("q1.parquet", 100)],
                ),
            ]),
            broken_dirs: vec![],
        });

        let discovery = adapter.discover(&config()).await.unwrap();
        assert_eq!(discovery.assets.len(), 3);

        let folder = discovery.assets.iter().find(|a| a.name == "2025").unwrap();
        assert_eq!(folder.kind, AssetKind::Folder);
        assert_eq!(folder.id, "share://acct/reports/2025");
        assert_eq!(folder.schema_path, "/");
        assert_eq!(folder.size_bytes, 0);

        let nested = discovery
            .assets
            .iter()
            .find(|a| a.name == "q1.parquet")
            .unwrap();
        assert_eq!(nested.kind, AssetKind::DataFile);
        assert_eq!(nested.schema_path, "2025");
        assert_eq!(nested.id, "share://acct/reports/2025/q1.parquet");

        assert_eq!(discovery.containers[0].asset_count, 3);
    }

    #[tokio::test]
    async fn broken_subdirectory_does_not_abort_the_share() {
        let adapter = adapter_with(FakeShares {
            shares: vec!["mixed".into()],
            tree: HashMap::from([(
                ("mixed".to_string(), String::new()),
                vec![dir("locked"), file("ok.csv", 5)],
            )]),
            broken_dirs: vec![("mixed".to_string(), "locked".to_string())],
        });

        let discovery = adapter.discover(&config()).await.unwrap();
        // folder marker plus the readable file survive
        assert_eq!(discovery.assets.len(), 2);
        assert_eq!(discovery.failures.len(), 1);
        assert_eq!(discovery.failures[0].name, "mixed/locked");
    }
}
