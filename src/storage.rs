mod local;
mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use local::LocalStorage;
pub use remote::{ObjectStoreBackend, ObjectStoreClient};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("object not found: {bucket}/{key}")]
  NotFound { bucket: String, key: String },

  #[error("permission denied: {bucket}/{key}")]
  PermissionDenied { bucket: String, key: String },

  #[error("storage io error")]
  Io(#[from] std::io::Error),

  #[error("storage backend error: {0}")]
  Backend(String),
}

/// A (bucket, key) pair identifying a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageReference {
  pub bucket: String,
  pub key: String,
}

impl std::fmt::Display for StorageReference {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.bucket, self.key)
  }
}

/// Which configured bucket an object key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
  /// Source documents, e.g. uploaded PDFs.
  Source,
  /// Parsed-text artifacts produced by the pipeline.
  Preprocessed,
}

/// Derive the bucket from the shape of the object key alone. Parsed-text
/// keys live under a per-document prefix (`"<doc-id>/text.txt"`); source
/// documents are keyed by filename, possibly under a folder, with a document
/// extension.
pub fn route_bucket(key: &str) -> BucketKind {
  if key.contains('/') && !key.to_ascii_lowercase().ends_with(".pdf") {
    BucketKind::Preprocessed
  } else {
    BucketKind::Source
  }
}

/// Names of the two buckets the pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketLayout {
  #[serde(default = "default_source_bucket")]
  pub source: String,
  #[serde(default = "default_preprocessed_bucket")]
  pub preprocessed: String,
}

impl Default for BucketLayout {
  fn default() -> Self {
    Self {
      source: default_source_bucket(),
      preprocessed: default_preprocessed_bucket(),
    }
  }
}

impl BucketLayout {
  pub fn name(&self, kind: BucketKind) -> &str {
    match kind {
      BucketKind::Source => &self.source,
      BucketKind::Preprocessed => &self.preprocessed,
    }
  }

  /// Bucket name for a given object key.
  pub fn bucket_for(&self, key: &str) -> &str {
    self.name(route_bucket(key))
  }
}

fn default_source_bucket() -> String {
  "mybucket".to_string()
}

fn default_preprocessed_bucket() -> String {
  "prep".to_string()
}

/// Uniform upload/download/existence contract over the configured buckets.
/// Callers never pass a bucket; it is derived from the key.
///
/// Implementations must classify connectivity and permission faults as
/// `StorageError` rather than returning empty data.
#[async_trait]
pub trait StorageBackend: Send + Sync {
  /// Whether an object exists under the bucket routed from `key`.
  async fn exists(&self, key: &str) -> Result<bool, StorageError>;

  /// Store `bytes` under the bucket routed from `key`, returning the full
  /// reference of the written object.
  async fn upload(&self, key: &str, bytes: &[u8]) -> Result<StorageReference, StorageError>;

  /// Fetch the object under the bucket routed from `key`.
  async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}
