//! Filesystem object storage
//!
//! Stores proof artifacts as files under a root directory. The artifact
//! reference is the relative path, so the same keys work if the root moves.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, PortError};
use domain_payments::{ArtifactRef, ObjectStoragePort};

/// Object storage backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    /// Opens storage rooted at `root`, creating the directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, PortError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| io_error("create storage root", &root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key below the root; absolute paths and `..` are refused
    fn resolve(&self, key: &str) -> Result<PathBuf, PortError> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !plain {
            return Err(PortError::validation_field(
                format!("invalid artifact key '{}'", key),
                "file_path_ref",
            ));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(action: &str, path: &Path, error: std::io::Error) -> PortError {
    PortError::Internal {
        message: format!("{} failed for {}: {}", action, path.display(), error),
        source: Some(Box::new(error)),
    }
}

impl DomainPort for LocalObjectStorage {}

#[async_trait]
impl ObjectStoragePort for LocalObjectStorage {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<ArtifactRef, PortError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory", parent, e))?;
        }
        fs::write(&target, bytes)
            .await
            .map_err(|e| io_error("write", &target, e))?;
        debug!("Artifact stored");
        Ok(ArtifactRef::new(path))
    }

    #[instrument(skip(self), fields(artifact = %artifact))]
    async fn download(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, PortError> {
        let target = self.resolve(artifact.as_str())?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PortError::not_found("Artifact", artifact))
            }
            Err(e) => Err(io_error("read", &target, e)),
        }
    }

    #[instrument(skip(self), fields(artifact = %artifact))]
    async fn remove(&self, artifact: &ArtifactRef) -> Result<(), PortError> {
        let target = self.resolve(artifact.as_str())?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &target, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path()).await.unwrap();

        let artifact = storage
            .upload("payment-proofs/plan/inst/recibo.pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        assert_eq!(artifact.as_str(), "payment-proofs/plan/inst/recibo.pdf");
        assert_eq!(storage.download(&artifact).await.unwrap(), b"%PDF".to_vec());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path()).await.unwrap();

        let err = storage.download(&ArtifactRef::new("nope.pdf")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path()).await.unwrap();
        let artifact = storage.upload("a/b.jpg", vec![1, 2, 3]).await.unwrap();

        storage.remove(&artifact).await.unwrap();
        storage.remove(&artifact).await.unwrap();
        assert!(storage.download(&artifact).await.is_err());
    }

    #[tokio::test]
    async fn test_escaping_keys_are_refused() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path()).await.unwrap();

        for key in ["../outside.pdf", "/etc/passwd", "a/../../b", ""] {
            let err = storage.upload(key, vec![0]).await.unwrap_err();
            assert!(matches!(err, PortError::Validation { .. }), "key {:?}", key);
        }
    }
}
