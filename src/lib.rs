//! Asynchronous document-ingestion service: tasks arrive on a queue, a
//! registry maps each task type to a processing pipeline, and a bounded
//! worker pool runs `Acquire → Parse → Chunk → Embed → Persist` while the
//! consumer reports status back on the result queue.

mod chunker;
mod config;
mod consumer;
mod embeddings;
mod model_access;
mod models;
mod parser;
mod pipeline;
mod queue;
mod sinks;
mod storage;

pub use chunker::{ChunkError, Chunker, ChunkingConfig, TextWindowChunker};
pub use config::{
  CollectionConfig, Config, EmbeddingConfig, OpenAILikeConfig, QueueConfig,
};
pub use consumer::TaskConsumer;
pub use embeddings::{
  EmbeddingError, EmbeddingProvider, EmbeddingResult, OpenAILikeEmbeddingProvider,
};
pub use model_access::{ModelAccess, ModelAccessBuilder, ModelError};
pub use models::{Chunk, ChunkRecord, Document, Task, TaskStatus};
pub use parser::{DocumentParser, ParseError, PlainTextParser};
pub use pipeline::{
  DocumentPipeline, Pipeline, PipelineError, PipelineOutput, PipelineRegistry,
};
pub use queue::{
  Delivery, LocalQueue, LocalQueueHandle, QueueTransport, StatusMessage, TransportError,
};
pub use sinks::{ChunkSink, MemorySink, SinkError};
pub use storage::{
  BucketKind, BucketLayout, LocalStorage, ObjectStoreBackend, ObjectStoreClient, StorageBackend,
  StorageError, StorageReference, route_bucket,
};
