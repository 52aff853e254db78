use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{BucketLayout, StorageBackend, StorageError, StorageReference};

/// Wire client for a remote object store (MinIO, S3, ...). The pipeline only
/// depends on this boundary; connection handling, credentials and retries
/// belong to the implementation.
///
/// Implementations must be stateless per call and safe for concurrent use.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
  async fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError>;

  async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

  /// Whether the object exists. Connectivity or permission faults are errors,
  /// never a silent `false`.
  async fn stat_object(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;
}

/// Storage backend over a remote object store. Bucket routing happens here,
/// from the key shape alone; the client never chooses a bucket.
pub struct ObjectStoreBackend {
  client: Arc<dyn ObjectStoreClient>,
  buckets: BucketLayout,
}

impl ObjectStoreBackend {
  pub fn new(client: Arc<dyn ObjectStoreClient>, buckets: BucketLayout) -> Self {
    Self { client, buckets }
  }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
  async fn exists(&self, key: &str) -> Result<bool, StorageError> {
    let bucket = self.buckets.bucket_for(key);
    self.client.stat_object(bucket, key).await
  }

  async fn upload(&self, key: &str, bytes: &[u8]) -> Result<StorageReference, StorageError> {
    let bucket = self.buckets.bucket_for(key);
    self.client.put_object(bucket, key, bytes).await?;
    debug!(bucket, key, size = bytes.len(), "Uploaded object");
    Ok(StorageReference {
      bucket: bucket.to_string(),
      key: key.to_string(),
    })
  }

  async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
    let bucket = self.buckets.bucket_for(key);
    self.client.get_object(bucket, key).await
  }
}
