use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use text_splitter::TextSplitter;
use tracing::debug;

use crate::models::Chunk;

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
  #[error("invalid chunking configuration: {0}")]
  InvalidConfig(String),

  #[error("chunking backend failed: {0}")]
  Upstream(String),
}

/// Length and overlap constraints for chunking. For a given configuration a
/// chunker must produce the same chunk sequence for the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
  /// Chunks shorter than this are only allowed as the trailing chunk.
  #[serde(default = "default_min_chunk_length")]
  pub min_chunk_length: usize,

  /// Hard upper bound; a strategy must split further rather than exceed it.
  #[serde(default = "default_max_chunk_length")]
  pub max_chunk_length: usize,

  /// Overlap window between consecutive chunks.
  #[serde(default = "default_chunk_overlap")]
  pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
  fn default() -> Self {
    Self {
      min_chunk_length: default_min_chunk_length(),
      max_chunk_length: default_max_chunk_length(),
      chunk_overlap: default_chunk_overlap(),
    }
  }
}

fn default_min_chunk_length() -> usize {
  50
}

fn default_max_chunk_length() -> usize {
  512
}

fn default_chunk_overlap() -> usize {
  16
}

/// Split parsed text into ordered chunks under length/overlap constraints.
/// Strategies are injected at pipeline construction; LLM-backed strategies
/// implement the same capability and surface their upstream failures as
/// `ChunkError::Upstream`.
#[async_trait]
pub trait Chunker: Send + Sync {
  async fn chunk(&self, text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ChunkError>;
}

/// Deterministic rule-based strategy: semantic-boundary splitting within a
/// `min..max` capacity window, with the configured overlap.
pub struct TextWindowChunker;

#[async_trait]
impl Chunker for TextWindowChunker {
  async fn chunk(&self, text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ChunkError> {
    if config.max_chunk_length == 0 || config.min_chunk_length > config.max_chunk_length {
      return Err(ChunkError::InvalidConfig(format!(
        "min {} must not exceed max {}",
        config.min_chunk_length, config.max_chunk_length
      )));
    }

    let splitter_config =
      text_splitter::ChunkConfig::new(config.min_chunk_length..config.max_chunk_length)
        .with_overlap(config.chunk_overlap)
        .map_err(|e| ChunkError::InvalidConfig(e.to_string()))?;
    let splitter = TextSplitter::new(splitter_config);

    let chunks: Vec<Chunk> = splitter
      .chunk_indices(text)
      .enumerate()
      .map(|(index, (start, chunk_text))| Chunk {
        index,
        start,
        end: start + chunk_text.len(),
        text: chunk_text.to_string(),
      })
      .collect();

    debug!(
      chunk_count = chunks.len(),
      text_len = text.len(),
      "Chunked parsed text"
    );
    Ok(chunks)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config(min: usize, max: usize, overlap: usize) -> ChunkingConfig {
    ChunkingConfig {
      min_chunk_length: min,
      max_chunk_length: max,
      chunk_overlap: overlap,
    }
  }

  fn sample_text() -> String {
    let mut text = String::new();
    for i in 0..40 {
      text.push_str(&format!("Sentence number {i} talks about document ingestion. "));
    }
    text
  }

  #[tokio::test]
  async fn never_exceeds_max_length() {
    let chunks = TextWindowChunker
      .chunk(&sample_text(), &config(20, 80, 0))
      .await
      .unwrap();
    assert!(chunks.len() > 1);
    for chunk in &chunks {
      assert!(chunk.len() <= 80, "chunk of {} bytes exceeds max", chunk.len());
    }
  }

  #[tokio::test]
  async fn short_trailing_chunk_is_tolerated() {
    let text = sample_text();
    let chunks = TextWindowChunker
      .chunk(&text, &config(20, 80, 0))
      .await
      .unwrap();
    // Every chunk but the last respects the minimum.
    for chunk in &chunks[..chunks.len() - 1] {
      assert!(chunk.len() >= 20);
    }
  }

  #[tokio::test]
  async fn indices_and_offsets_are_ordered() {
    let text = sample_text();
    let chunks = TextWindowChunker
      .chunk(&text, &config(20, 80, 0))
      .await
      .unwrap();
    for (i, chunk) in chunks.iter().enumerate() {
      assert_eq!(chunk.index, i);
      assert_eq!(&text[chunk.start..chunk.end], chunk.text);
      if i > 0 {
        assert!(chunk.start >= chunks[i - 1].start);
      }
    }
  }

  #[tokio::test]
  async fn same_config_is_deterministic() {
    let text = sample_text();
    let first = TextWindowChunker
      .chunk(&text, &config(20, 100, 10))
      .await
      .unwrap();
    let second = TextWindowChunker
      .chunk(&text, &config(20, 100, 10))
      .await
      .unwrap();
    assert_eq!(first, second);
  }

  #[tokio::test]
  async fn overlap_repeats_text_between_neighbors() {
    let text = sample_text();
    let chunks = TextWindowChunker
      .chunk(&text, &config(60, 100, 30))
      .await
      .unwrap();
    assert!(chunks.len() > 1);
    let overlapping = chunks
      .windows(2)
      .filter(|pair| pair[1].start < pair[0].end)
      .count();
    assert!(overlapping > 0, "expected overlapping windows");
  }

  #[tokio::test]
  async fn invalid_bounds_are_rejected() {
    let err = TextWindowChunker
      .chunk("text", &config(100, 10, 0))
      .await
      .unwrap_err();
    assert!(matches!(err, ChunkError::InvalidConfig(_)));
  }

  #[tokio::test]
  async fn empty_text_yields_no_chunks() {
    let chunks = TextWindowChunker
      .chunk("", &config(20, 80, 0))
      .await
      .unwrap();
    assert!(chunks.is_empty());
  }
}
