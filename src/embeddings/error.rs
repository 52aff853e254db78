#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
  #[error("API error: {0}")]
  ApiError(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("HTTP request failed")]
  Http(#[from] reqwest::Error),

  #[error("batch size exceeded: {actual} items > max {max}")]
  BatchSizeExceeded { actual: usize, max: usize },

  #[error("provider returned {actual} embeddings for {expected} inputs")]
  CountMismatch { expected: usize, actual: usize },

  #[error("provider returned a {actual}-dim vector, expected {expected}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("embedding operation failed: {0}")]
  EmbeddingFailed(String),
}

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
