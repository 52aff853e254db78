use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{BucketLayout, StorageBackend, StorageError, StorageReference};

/// Filesystem-backed storage for local and test deployments. Objects live
/// under `<base_dir>/<bucket>/<key>`.
pub struct LocalStorage {
  base_dir: PathBuf,
  buckets: BucketLayout,
}

impl LocalStorage {
  pub fn new(base_dir: impl Into<PathBuf>, buckets: BucketLayout) -> Self {
    Self {
      base_dir: base_dir.into(),
      buckets,
    }
  }

  fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
    self.base_dir.join(bucket).join(key)
  }

  fn classify(err: std::io::Error, bucket: &str, key: &str) -> StorageError {
    match err.kind() {
      ErrorKind::NotFound => StorageError::NotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
      },
      ErrorKind::PermissionDenied => StorageError::PermissionDenied {
        bucket: bucket.to_string(),
        key: key.to_string(),
      },
      _ => StorageError::Io(err),
    }
  }
}

#[async_trait]
impl StorageBackend for LocalStorage {
  async fn exists(&self, key: &str) -> Result<bool, StorageError> {
    let bucket = self.buckets.bucket_for(key);
    let path = self.object_path(bucket, key);
    tokio::fs::try_exists(&path)
      .await
      .map_err(|e| Self::classify(e, bucket, key))
  }

  async fn upload(&self, key: &str, bytes: &[u8]) -> Result<StorageReference, StorageError> {
    let bucket = self.buckets.bucket_for(key);
    let path = self.object_path(bucket, key);
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Self::classify(e, bucket, key))?;
    }
    tokio::fs::write(&path, bytes)
      .await
      .map_err(|e| Self::classify(e, bucket, key))?;
    debug!(bucket, key, size = bytes.len(), "Stored object locally");
    Ok(StorageReference {
      bucket: bucket.to_string(),
      key: key.to_string(),
    })
  }

  async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
    let bucket = self.buckets.bucket_for(key);
    let path = self.object_path(bucket, key);
    tokio::fs::read(&path)
      .await
      .map_err(|e| Self::classify(e, bucket, key))
  }
}

impl LocalStorage {
  /// Absolute path an object key resolves to, mostly useful in tests.
  pub fn resolve(&self, key: &str) -> PathBuf {
    let bucket = self.buckets.bucket_for(key);
    self.object_path(bucket, key)
  }

  pub fn base_dir(&self) -> &Path {
    &self.base_dir
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn storage() -> (tempfile::TempDir, LocalStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), BucketLayout::default());
    (dir, storage)
  }

  #[tokio::test]
  async fn upload_then_download_round_trips() {
    let (_dir, storage) = storage();
    let reference = storage.upload("doc1/text.txt", b"parsed text").await.unwrap();
    assert_eq!(reference.bucket, "prep");
    assert_eq!(reference.key, "doc1/text.txt");

    let bytes = storage.download("doc1/text.txt").await.unwrap();
    assert_eq!(bytes, b"parsed text");
  }

  #[tokio::test]
  async fn exists_reflects_uploads() {
    let (_dir, storage) = storage();
    assert!(!storage.exists("doc1/text.txt").await.unwrap());
    storage.upload("doc1/text.txt", b"t").await.unwrap();
    assert!(storage.exists("doc1/text.txt").await.unwrap());
  }

  #[tokio::test]
  async fn missing_object_is_classified_not_found() {
    let (_dir, storage) = storage();
    let err = storage.download("missing.pdf").await.unwrap_err();
    match err {
      StorageError::NotFound { bucket, key } => {
        assert_eq!(bucket, "mybucket");
        assert_eq!(key, "missing.pdf");
      }
      other => panic!("expected NotFound, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn exists_surfaces_classified_errors() {
    let (_dir, storage) = storage();
    storage.upload("doc1/text.txt", b"t").await.unwrap();
    // Descending through an existing regular file cannot be answered with
    // a plain true/false; the fault must surface as a storage error.
    let err = storage.exists("doc1/text.txt/deeper").await.unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));
  }

  #[test]
  fn permission_faults_are_classified() {
    let err = LocalStorage::classify(
      std::io::Error::from(ErrorKind::PermissionDenied),
      "prep",
      "doc1/text.txt",
    );
    match err {
      StorageError::PermissionDenied { bucket, key } => {
        assert_eq!(bucket, "prep");
        assert_eq!(key, "doc1/text.txt");
      }
      other => panic!("expected PermissionDenied, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn source_and_preprocessed_objects_land_in_different_buckets() {
    let (dir, storage) = storage();
    storage.upload("a.pdf", b"%PDF").await.unwrap();
    storage.upload("a/text.txt", b"text").await.unwrap();
    assert!(dir.path().join("mybucket/a.pdf").exists());
    assert!(dir.path().join("prep/a/text.txt").exists());
  }
}
