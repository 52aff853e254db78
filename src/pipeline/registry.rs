use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::Pipeline;

type PipelineFactory = Box<dyn Fn() -> Arc<dyn Pipeline> + Send + Sync>;

/// Maps a task-type identifier to a pipeline factory. Populated once at
/// startup (single writer), then shared immutably behind an `Arc`; this is
/// the only extension point for new processing types.
#[derive(Default)]
pub struct PipelineRegistry {
  entries: HashMap<String, PipelineFactory>,
}

impl PipelineRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a factory for a task type. Overwrites any existing entry
  /// (last writer wins; used for test overrides and extension).
  pub fn register<F>(&mut self, task_type: impl Into<String>, factory: F)
  where
    F: Fn() -> Arc<dyn Pipeline> + Send + Sync + 'static,
  {
    let task_type = task_type.into();
    debug!(task_type, "Registered pipeline");
    self.entries.insert(task_type, Box::new(factory));
  }

  /// Instantiate the pipeline for a task type. `None` means the type is
  /// unknown and the task must be rejected; there is no default pipeline.
  pub fn resolve(&self, task_type: &str) -> Option<Arc<dyn Pipeline>> {
    self.entries.get(task_type).map(|factory| factory())
  }

  pub fn task_types(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Task;
  use crate::pipeline::{PipelineError, PipelineOutput};
  use async_trait::async_trait;

  struct StubPipeline(usize);

  #[async_trait]
  impl Pipeline for StubPipeline {
    async fn process(&self, _task: &Task) -> Result<PipelineOutput, PipelineError> {
      Ok(PipelineOutput {
        chunk_count: self.0,
        parsed_text: None,
      })
    }
  }

  #[tokio::test]
  async fn resolves_registered_types() {
    let mut registry = PipelineRegistry::new();
    registry.register("pdf_default", || Arc::new(StubPipeline(1)));

    let pipeline = registry.resolve("pdf_default").unwrap();
    let task = Task::new("pdf_default", crate::models::Document::new("a.pdf"));
    assert_eq!(pipeline.process(&task).await.unwrap().chunk_count, 1);
  }

  #[test]
  fn unknown_type_is_not_found() {
    let registry = PipelineRegistry::new();
    assert!(registry.resolve("unknown").is_none());
  }

  #[tokio::test]
  async fn last_writer_wins() {
    let mut registry = PipelineRegistry::new();
    registry.register("pdf_default", || Arc::new(StubPipeline(1)));
    registry.register("pdf_default", || Arc::new(StubPipeline(2)));

    let pipeline = registry.resolve("pdf_default").unwrap();
    let task = Task::new("pdf_default", crate::models::Document::new("a.pdf"));
    assert_eq!(pipeline.process(&task).await.unwrap().chunk_count, 2);
  }
}
