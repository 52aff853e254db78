use serde::{Deserialize, Serialize};

use crate::chunker::ChunkingConfig;
use crate::storage::BucketLayout;

/// Queue names and worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
  #[serde(default = "default_task_queue")]
  pub task_queue: String,

  #[serde(default = "default_result_queue")]
  pub result_queue: String,

  /// Bound on concurrently executing pipelines.
  #[serde(default = "default_consumer_workers")]
  pub consumer_workers: usize,
}

impl Default for QueueConfig {
  fn default() -> Self {
    Self {
      task_queue: default_task_queue(),
      result_queue: default_result_queue(),
      consumer_workers: default_consumer_workers(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
  #[serde(default = "default_collection")]
  pub default_collection: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_partition: Option<String>,
}

impl Default for CollectionConfig {
  fn default() -> Self {
    Self {
      default_collection: default_collection(),
      default_partition: None,
    }
  }
}

/// Configuration for an OpenAI-compatible embedding endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAILikeConfig {
  /// API base URL, e.g. "https://api.openai.com/v1" or "http://localhost:8080/v1".
  pub api_base: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,

  pub model: String,

  pub embedding_dim: usize,

  pub max_batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
  /// Chunks embedded per provider call.
  #[serde(default = "default_embedding_batch_size")]
  pub batch_size: usize,

  /// Remote provider settings; absent when a preloaded provider is injected.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub openailike: Option<OpenAILikeConfig>,
}

impl Default for EmbeddingConfig {
  fn default() -> Self {
    Self {
      batch_size: default_embedding_batch_size(),
      openailike: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Eq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub queue: QueueConfig,

  #[serde(default)]
  pub buckets: BucketLayout,

  #[serde(default)]
  pub chunking: ChunkingConfig,

  #[serde(default)]
  pub embedding: EmbeddingConfig,

  #[serde(default)]
  pub collection: CollectionConfig,
}

impl Config {
  /// Configuration for unit tests: tiny chunks so short fixtures still
  /// produce several of them, and a small worker pool.
  #[cfg(any(test, feature = "testing"))]
  pub fn test() -> Self {
    Self {
      queue: QueueConfig {
        consumer_workers: 2,
        ..QueueConfig::default()
      },
      chunking: ChunkingConfig {
        min_chunk_length: 10,
        max_chunk_length: 64,
        chunk_overlap: 0,
      },
      embedding: EmbeddingConfig {
        batch_size: 4,
        openailike: None,
      },
      ..Self::default()
    }
  }
}

fn default_task_queue() -> String {
  "taskQueue".to_string()
}

fn default_result_queue() -> String {
  "respQueue".to_string()
}

fn default_consumer_workers() -> usize {
  4
}

fn default_collection() -> String {
  "default_collection".to_string()
}

fn default_embedding_batch_size() -> usize {
  4
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config() {
    let config = Config::default();
    assert_eq!(config.queue.task_queue, "taskQueue");
    assert_eq!(config.queue.result_queue, "respQueue");
    assert_eq!(config.queue.consumer_workers, 4);
    assert_eq!(config.buckets.source, "mybucket");
    assert_eq!(config.buckets.preprocessed, "prep");
    assert_eq!(config.chunking.max_chunk_length, 512);
    assert_eq!(config.collection.default_collection, "default_collection");
  }

  #[test]
  fn toml_round_trip() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&toml_str).unwrap();
    assert_eq!(config, parsed);
  }

  #[test]
  fn partial_toml_fills_defaults() {
    let parsed: Config = toml::from_str(
      r#"
      [queue]
      consumer_workers = 8

      [chunking]
      max_chunk_length = 1024
      "#,
    )
    .unwrap();
    assert_eq!(parsed.queue.consumer_workers, 8);
    assert_eq!(parsed.queue.task_queue, "taskQueue");
    assert_eq!(parsed.chunking.max_chunk_length, 1024);
    assert_eq!(parsed.chunking.min_chunk_length, 50);
  }
}
