use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Pipeline, PipelineError, PipelineOutput};
use crate::chunker::{ChunkError, ChunkingConfig};
use crate::config::Config;
use crate::embeddings::EmbeddingError;
use crate::model_access::ModelAccess;
use crate::models::{Chunk, ChunkRecord, Document, Task};
use crate::parser::ParseError;
use crate::sinks::ChunkSink;
use crate::storage::{StorageBackend, StorageError, StorageReference};

/// Default document pipeline: `Acquire → Parse → Chunk → Embed → Persist`.
///
/// If the parsed text for a document already exists in the preprocessed
/// bucket, Parse is skipped and the cached text is reused; resubmitting a
/// task whose parsing already succeeded never re-runs the parser.
///
/// With no storage backend configured the pipeline runs in local-only mode:
/// the source key names a local file and parsed text is not persisted.
pub struct DocumentPipeline {
  storage: Option<Arc<dyn StorageBackend>>,
  models: Arc<ModelAccess>,
  sink: Arc<dyn ChunkSink>,
  buckets: crate::storage::BucketLayout,
  chunking: ChunkingConfig,
  embed_batch_size: usize,
  default_collection: String,
  default_partition: Option<String>,
}

impl DocumentPipeline {
  pub fn new(
    config: &Config,
    storage: Option<Arc<dyn StorageBackend>>,
    models: Arc<ModelAccess>,
    sink: Arc<dyn ChunkSink>,
  ) -> Self {
    Self {
      storage,
      models,
      sink,
      buckets: config.buckets.clone(),
      chunking: config.chunking.clone(),
      embed_batch_size: config.embedding.batch_size,
      default_collection: config.collection.default_collection.clone(),
      default_partition: config.collection.default_partition.clone(),
    }
  }

  /// Resolve the document text, running the parser only when no cached
  /// parsed text exists. Returns the text and the persisted parsed-text
  /// reference, if any.
  async fn acquire(
    &self,
    doc: &Document,
  ) -> Result<(String, Option<StorageReference>), PipelineError> {
    let text_key = doc.parsed_text_key();

    let Some(storage) = &self.storage else {
      // Local-only mode: the source key is a filesystem path.
      let source = tokio::fs::read(&doc.source_key)
        .await
        .map_err(StorageError::Io)?;
      let text = self.parse(&source).await?;
      return Ok((text, None));
    };

    if storage.exists(&text_key).await? {
      info!(
        doc_id = doc.doc_id(),
        key = text_key,
        "Parsed text cached, skipping parse stage"
      );
      let bytes = storage.download(&text_key).await?;
      let text = String::from_utf8(bytes)
        .map_err(|e| PipelineError::Parse(ParseError::InvalidText(e.to_string())))?;
      // No upload happens on the cache path, so the reference is rebuilt
      // from the routing table.
      let bucket = self.buckets.bucket_for(&text_key).to_string();
      return Ok((text, Some(StorageReference {
        bucket,
        key: text_key,
      })));
    }

    let source = storage.download(&doc.source_key).await?;
    let text = self.parse(&source).await?;
    let reference = storage.upload(&text_key, text.as_bytes()).await?;
    debug!(doc_id = doc.doc_id(), reference = %reference, "Persisted parsed text");
    Ok((text, Some(reference)))
  }

  async fn parse(&self, source: &[u8]) -> Result<String, PipelineError> {
    let parser = self
      .models
      .parser()
      .await
      .map_err(|e| PipelineError::Parse(ParseError::Model(e.to_string())))?;
    Ok(parser.parse(source).await?)
  }

  async fn chunk(&self, text: &str) -> Result<Vec<Chunk>, PipelineError> {
    let chunker = self
      .models
      .chunker()
      .await
      .map_err(|e| PipelineError::Chunk(ChunkError::Upstream(e.to_string())))?;
    Ok(chunker.chunk(text, &self.chunking).await?)
  }

  /// Embed the full ordered chunk list, bounded batches, all-or-nothing.
  async fn embed(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, PipelineError> {
    let embedder = self
      .models
      .embedder()
      .await
      .map_err(|e| PipelineError::Embed(EmbeddingError::EmbeddingFailed(e.to_string())))?;

    let batch_size = self.embed_batch_size.min(embedder.max_batch_size()).max(1);
    let mut embeddings = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size) {
      let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
      let batch_embeddings = embedder.embed(&texts).await?;
      if batch_embeddings.len() != texts.len() {
        return Err(
          EmbeddingError::CountMismatch {
            expected: texts.len(),
            actual: batch_embeddings.len(),
          }
          .into(),
        );
      }
      embeddings.extend(batch_embeddings);
    }
    Ok(embeddings)
  }
}

#[async_trait]
impl Pipeline for DocumentPipeline {
  async fn process(&self, task: &Task) -> Result<PipelineOutput, PipelineError> {
    let doc = &task.document;
    let doc_id = doc.doc_id();

    let (text, parsed_text) = self.acquire(doc).await?;
    let chunks = self.chunk(&text).await?;
    let embeddings = self.embed(&chunks).await?;

    // Invariant: one embedding per chunk, or nothing is persisted.
    debug_assert_eq!(chunks.len(), embeddings.len());
    let records: Vec<ChunkRecord> = chunks
      .iter()
      .zip(embeddings)
      .map(|(chunk, vector)| ChunkRecord::from_chunk(&doc_id, chunk, vector))
      .collect();

    let collection = task
      .collection
      .as_deref()
      .unwrap_or(&self.default_collection);
    let partition = task
      .partition
      .as_deref()
      .or(self.default_partition.as_deref());
    self
      .sink
      .upsert(collection, partition, &doc_id, records)
      .await?;

    info!(
      task_id = %task.task_id,
      doc_id,
      collection,
      chunk_count = chunks.len(),
      "Document processed"
    );
    Ok(PipelineOutput {
      chunk_count: chunks.len(),
      parsed_text,
    })
  }
}
