use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::info;

use crate::chunker::Chunker;
use crate::embeddings::EmbeddingProvider;
use crate::parser::DocumentParser;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
  #[error("no {0} configured")]
  NotConfigured(&'static str),

  #[error("{model} initialization failed: {reason}")]
  InitFailed { model: &'static str, reason: String },
}

type InitFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<Arc<T>, ModelError>> + Send + Sync>;

/// Shared handles to the parser, chunker and embedding model. Each handle is
/// initialized at most once, no matter how many workers race to first use,
/// and then served from the cell without further synchronization cost.
///
/// Handles can be supplied up front (`builder().with_parser(...)`) or as
/// async factories that run on first use.
pub struct ModelAccess {
  parser: OnceCell<Arc<dyn DocumentParser>>,
  parser_init: Option<InitFn<dyn DocumentParser>>,
  chunker: OnceCell<Arc<dyn Chunker>>,
  chunker_init: Option<InitFn<dyn Chunker>>,
  embedder: OnceCell<Arc<dyn EmbeddingProvider>>,
  embedder_init: Option<InitFn<dyn EmbeddingProvider>>,
}

impl ModelAccess {
  pub fn builder() -> ModelAccessBuilder {
    ModelAccessBuilder::default()
  }

  pub async fn parser(&self) -> Result<Arc<dyn DocumentParser>, ModelError> {
    Self::handle("parser", &self.parser, &self.parser_init).await
  }

  pub async fn chunker(&self) -> Result<Arc<dyn Chunker>, ModelError> {
    Self::handle("chunker", &self.chunker, &self.chunker_init).await
  }

  pub async fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>, ModelError> {
    Self::handle("embedding model", &self.embedder, &self.embedder_init).await
  }

  async fn handle<T: ?Sized>(
    name: &'static str,
    cell: &OnceCell<Arc<T>>,
    init: &Option<InitFn<T>>,
  ) -> Result<Arc<T>, ModelError> {
    cell
      .get_or_try_init(|| async {
        let factory = init.as_ref().ok_or(ModelError::NotConfigured(name))?;
        let handle = factory().await?;
        info!(model = name, "Initialized model handle");
        Ok(handle)
      })
      .await
      .cloned()
  }
}

#[derive(Default)]
pub struct ModelAccessBuilder {
  parser: Option<Arc<dyn DocumentParser>>,
  parser_init: Option<InitFn<dyn DocumentParser>>,
  chunker: Option<Arc<dyn Chunker>>,
  chunker_init: Option<InitFn<dyn Chunker>>,
  embedder: Option<Arc<dyn EmbeddingProvider>>,
  embedder_init: Option<InitFn<dyn EmbeddingProvider>>,
}

impl ModelAccessBuilder {
  pub fn with_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
    self.parser = Some(parser);
    self
  }

  pub fn with_parser_init<F>(mut self, init: F) -> Self
  where
    F: Fn() -> BoxFuture<'static, Result<Arc<dyn DocumentParser>, ModelError>>
      + Send
      + Sync
      + 'static,
  {
    self.parser_init = Some(Box::new(init));
    self
  }

  pub fn with_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
    self.chunker = Some(chunker);
    self
  }

  pub fn with_chunker_init<F>(mut self, init: F) -> Self
  where
    F: Fn() -> BoxFuture<'static, Result<Arc<dyn Chunker>, ModelError>> + Send + Sync + 'static,
  {
    self.chunker_init = Some(Box::new(init));
    self
  }

  pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
    self.embedder = Some(embedder);
    self
  }

  pub fn with_embedder_init<F>(mut self, init: F) -> Self
  where
    F: Fn() -> BoxFuture<'static, Result<Arc<dyn EmbeddingProvider>, ModelError>>
      + Send
      + Sync
      + 'static,
  {
    self.embedder_init = Some(Box::new(init));
    self
  }

  pub fn build(self) -> ModelAccess {
    ModelAccess {
      parser: preloaded(self.parser),
      parser_init: self.parser_init,
      chunker: preloaded(self.chunker),
      chunker_init: self.chunker_init,
      embedder: preloaded(self.embedder),
      embedder_init: self.embedder_init,
    }
  }
}

fn preloaded<T: ?Sized>(value: Option<Arc<T>>) -> OnceCell<Arc<T>> {
  match value {
    Some(v) => OnceCell::new_with(Some(v)),
    None => OnceCell::new(),
  }
}
