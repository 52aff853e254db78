mod document;
mod registry;

use async_trait::async_trait;

use crate::chunker::ChunkError;
use crate::embeddings::EmbeddingError;
use crate::models::Task;
use crate::parser::ParseError;
use crate::sinks::SinkError;
use crate::storage::{StorageError, StorageReference};

pub use document::DocumentPipeline;
pub use registry::PipelineRegistry;

/// Classified stage failure. Every external call inside a pipeline is
/// translated into one of these before it crosses the pipeline boundary;
/// nothing escapes unclassified.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
  #[error("parse stage failed: {0}")]
  Parse(#[from] ParseError),

  #[error("chunk stage failed: {0}")]
  Chunk(#[from] ChunkError),

  #[error("embed stage failed: {0}")]
  Embed(#[from] EmbeddingError),

  #[error("storage access failed: {0}")]
  Storage(#[from] StorageError),

  #[error("persist stage failed: {0}")]
  Persist(#[from] SinkError),
}

impl PipelineError {
  /// Stable error-kind string carried on FAILED status messages.
  pub fn kind(&self) -> &'static str {
    match self {
      PipelineError::Parse(_) => "ParseError",
      PipelineError::Chunk(_) => "ChunkError",
      PipelineError::Embed(_) => "EmbedError",
      PipelineError::Storage(_) => "StorageError",
      PipelineError::Persist(_) => "StorageError",
    }
  }
}

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
  pub chunk_count: usize,
  /// Where the parsed text was persisted, when a storage backend is
  /// configured.
  pub parsed_text: Option<StorageReference>,
}

/// An ordered stage sequence consuming one task. Stateless between
/// invocations except through the storage backend and the sink.
#[async_trait]
pub trait Pipeline: Send + Sync {
  async fn process(&self, task: &Task) -> Result<PipelineOutput, PipelineError>;
}
