mod error;
mod openailike;

use async_trait::async_trait;

pub use error::{EmbeddingError, EmbeddingResult};
pub use openailike::OpenAILikeEmbeddingProvider;

/// Boundary to the embedding model. Providers embed one bounded batch per
/// call and must tolerate concurrent invocation from multiple workers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
  /// Embed a batch of texts, returning one vector per input in input order.
  /// A failure anywhere in the batch fails the whole call; providers never
  /// return partial results.
  async fn embed(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

  /// Fixed dimension of the vectors this provider produces.
  fn embedding_dim(&self) -> usize;

  /// Maximum number of texts accepted per `embed` call.
  fn max_batch_size(&self) -> usize;
}
