mod memory;

use async_trait::async_trait;

use crate::models::ChunkRecord;

pub use memory::MemorySink;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
  #[error("vector store unavailable: {0}")]
  Unavailable(String),

  #[error("vector store write failed: {0}")]
  Write(String),
}

/// Boundary to the vector store. One upsert call persists the full record
/// set for a document, replacing any prior records sharing its document id
/// (overwrite, never append).
#[async_trait]
pub trait ChunkSink: Send + Sync {
  async fn upsert(
    &self,
    collection: &str,
    partition: Option<&str>,
    document_id: &str,
    records: Vec<ChunkRecord>,
  ) -> Result<(), SinkError>;
}
