use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{ChunkSink, SinkError};
use crate::models::ChunkRecord;

#[derive(Debug, Clone)]
struct StoredDocument {
  partition: Option<String>,
  records: Vec<ChunkRecord>,
}

/// In-memory vector sink for tests and local deployments. Keyed by
/// (collection, document id) so an upsert replaces the prior record set.
#[derive(Default)]
pub struct MemorySink {
  documents: DashMap<(String, String), StoredDocument>,
}

impl MemorySink {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records currently stored for a document, in chunk order.
  pub fn records_for(&self, collection: &str, document_id: &str) -> Option<Vec<ChunkRecord>> {
    self
      .documents
      .get(&(collection.to_string(), document_id.to_string()))
      .map(|entry| entry.records.clone())
  }

  pub fn partition_for(&self, collection: &str, document_id: &str) -> Option<Option<String>> {
    self
      .documents
      .get(&(collection.to_string(), document_id.to_string()))
      .map(|entry| entry.partition.clone())
  }

  pub fn document_count(&self, collection: &str) -> usize {
    self
      .documents
      .iter()
      .filter(|entry| entry.key().0 == collection)
      .count()
  }
}

#[async_trait]
impl ChunkSink for MemorySink {
  async fn upsert(
    &self,
    collection: &str,
    partition: Option<&str>,
    document_id: &str,
    records: Vec<ChunkRecord>,
  ) -> Result<(), SinkError> {
    debug!(
      collection,
      document_id,
      records = records.len(),
      "Upserting chunk records"
    );
    self.documents.insert(
      (collection.to_string(), document_id.to_string()),
      StoredDocument {
        partition: partition.map(|p| p.to_string()),
        records,
      },
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(doc: &str, index: usize) -> ChunkRecord {
    ChunkRecord {
      document_id: doc.to_string(),
      chunk_index: index,
      text: format!("chunk {index}"),
      vector: vec![0.0; 4],
      start_offset: index * 10,
      end_offset: index * 10 + 8,
    }
  }

  #[tokio::test]
  async fn upsert_replaces_prior_records() {
    let sink = MemorySink::new();
    sink
      .upsert("col", None, "doc1", vec![record("doc1", 0), record("doc1", 1)])
      .await
      .unwrap();
    sink
      .upsert("col", None, "doc1", vec![record("doc1", 0)])
      .await
      .unwrap();

    let records = sink.records_for("col", "doc1").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(sink.document_count("col"), 1);
  }

  #[tokio::test]
  async fn collections_are_isolated() {
    let sink = MemorySink::new();
    sink
      .upsert("a", None, "doc1", vec![record("doc1", 0)])
      .await
      .unwrap();
    sink
      .upsert("b", Some("p1"), "doc1", vec![record("doc1", 0)])
      .await
      .unwrap();

    assert_eq!(sink.document_count("a"), 1);
    assert_eq!(sink.document_count("b"), 1);
    assert_eq!(sink.partition_for("b", "doc1").unwrap().as_deref(), Some("p1"));
  }
}
