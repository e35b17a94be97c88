//! File-system discovery adapter
//!
//! Walks a local directory root. Self-contained (no source gateway), so it
//! is always registered and doubles as the reference adapter for generic
//! file-system connectors.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::trait_::DiscoveryAdapter;
use super::{
    AssetDescriptor, AssetKind, ContainerSummary, Discovery, DiscoveryError, file_asset_id,
};
use crate::repositories::connector_config::ConnectorDiscoveryConfig;

pub const SOURCE_LABEL: &str = "File System";

#[derive(Default)]
pub struct FileSystemAdapter;

impl FileSystemAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiscoveryAdapter for FileSystemAdapter {
    async fn discover(
        &self,
        config: &ConnectorDiscoveryConfig,
    ) -> Result<Discovery, DiscoveryError> {
        let root = config
            .root_path
            .clone()
            .ok_or_else(|| DiscoveryError::configuration("file-system connector requires root_path"))?;
        let root = PathBuf::from(root);

        // The walk is blocking filesystem IO; keep it off the async runtime.
        tokio::task::spawn_blocking(move || walk_root(&root))
            .await
            .map_err(|err| DiscoveryError::remote_unavailable(err.to_string()))?
    }
}

fn walk_root(root: &Path) -> Result<Discovery, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::configuration(format!(
            "root_path '{}' is not a directory",
            root.display()
        )));
    }

    let catalog = root
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| root.display().to_string());

    let mut discovery = Discovery::default();
    let mut asset_count = 0;

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let failed = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                discovery.record_failure(&failed, err);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        let schema_path = entry
            .path()
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(|rel| rel.to_string_lossy().to_string())
            .filter(|rel| !rel.is_empty())
            .unwrap_or_else(|| "/".to_string());

        if entry.file_type().is_dir() {
            discovery.assets.push(AssetDescriptor {
                id: file_asset_id(entry.path()),
                name,
                kind: AssetKind::Folder,
                catalog: catalog.clone(),
                schema_path,
                size_bytes: 0,
                last_modified: Utc::now(),
                source: SOURCE_LABEL.to_string(),
            });
            asset_count += 1;
            continue;
        }

        let (size_bytes, last_modified) = match entry.metadata() {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                (meta.len() as i64, modified)
            }
            Err(_) => (0, Utc::now()),
        };

        discovery.assets.push(AssetDescriptor {
            id: file_asset_id(entry.path()),
            kind: AssetKind::classify(&name),
            name,
            catalog: catalog.clone(),
            schema_path,
            size_bytes,
            last_modified,
            source: SOURCE_LABEL.to_string(),
        });
        asset_count += 1;
    }

    discovery.containers.push(ContainerSummary {
        name: catalog,
        asset_count,
    });

    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[tokio::test]
    async fn walks_a_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("top.csv"), b"a,b\n1,2\n").unwrap();
        fs::write(dir.path().join("nested/run.py"), b"print('hi')\n").unwrap();

        let config = ConnectorDiscoveryConfig::from_config(Some(&json!({
            "root_path": dir.path().to_string_lossy(),
        })));

        let discovery = FileSystemAdapter::new().discover(&config).await.unwrap();
        assert_eq!(discovery.assets.len(), 3);
        assert_eq!(discovery.containers.len(), 1);
        assert_eq!(discovery.containers[0].asset_count, 3);

        let csv = discovery.assets.iter().find(|a| a.name == "top.csv").unwrap();
        assert_eq!(csv.kind, AssetKind::DataFile);
        assert_eq!(csv.schema_path, "/");
        assert!(csv.size_bytes > 0);

        let folder = discovery.assets.iter().find(|a| a.name == "nested").unwrap();
        assert_eq!(folder.kind, AssetKind::Folder);

        let script = discovery.assets.iter().find(|a| a.name == "run.py").unwrap();
        assert_eq!(script.kind, AssetKind::Script);
        assert_eq!(script.schema_path, "nested");
    }

    #[tokio::test]
    async fn missing_root_is_a_configuration_error() {
        let config = ConnectorDiscoveryConfig::from_config(Some(&json!({})));
        let err = FileSystemAdapter::new().discover(&config).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Configuration { .. }));

        let config = ConnectorDiscoveryConfig::from_config(Some(&json!({
            "root_path": "/definitely/not/a/real/path",
        })));
        let err = FileSystemAdapter::new().discover(&config).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Configuration { .. }));
    }
}
