use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use crate::config::OpenAILikeConfig;

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
  input: Vec<String>,
  model: String,
  encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
  index: usize,
  embedding: Vec<f32>,
}

/// OpenAI-compatible embedding provider.
pub struct OpenAILikeEmbeddingProvider {
  client: reqwest::Client,
  api_base: String,
  api_key: Option<String>,
  model: String,
  embedding_dim: usize,
  max_batch_size: usize,
}

impl OpenAILikeEmbeddingProvider {
  pub fn new(config: &OpenAILikeConfig) -> EmbeddingResult<Self> {
    if config.embedding_dim == 0 {
      return Err(EmbeddingError::InvalidConfig(
        "embedding_dim must be non-zero".to_string(),
      ));
    }
    if config.max_batch_size == 0 {
      return Err(EmbeddingError::InvalidConfig(
        "max_batch_size must be non-zero".to_string(),
      ));
    }

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;

    Ok(Self {
      client,
      api_base: config.api_base.trim_end_matches('/').to_string(),
      api_key: config.api_key.clone(),
      model: config.model.clone(),
      embedding_dim: config.embedding_dim,
      max_batch_size: config.max_batch_size,
    })
  }
}

#[async_trait]
impl EmbeddingProvider for OpenAILikeEmbeddingProvider {
  async fn embed(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
    if texts.len() > self.max_batch_size {
      return Err(EmbeddingError::BatchSizeExceeded {
        actual: texts.len(),
        max: self.max_batch_size,
      });
    }

    let request = EmbeddingRequest {
      input: texts.iter().map(|t| t.to_string()).collect(),
      model: self.model.clone(),
      encoding_format: "float",
    };

    debug!(batch_size = texts.len(), model = %self.model, "Requesting embeddings");

    let mut builder = self
      .client
      .post(format!("{}/embeddings", self.api_base))
      .json(&request);
    if let Some(key) = &self.api_key {
      builder = builder.bearer_auth(key);
    }

    let response = builder.send().await?;
    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(EmbeddingError::ApiError(format!("{status}: {body}")));
    }
    let payload: EmbeddingResponse = response.json().await?;

    if payload.data.len() != texts.len() {
      return Err(EmbeddingError::CountMismatch {
        expected: texts.len(),
        actual: payload.data.len(),
      });
    }

    // Restore input order from the response index field.
    let mut embeddings = vec![Vec::new(); texts.len()];
    for item in payload.data {
      if item.index >= embeddings.len() {
        return Err(EmbeddingError::EmbeddingFailed(format!(
          "response index {} out of range",
          item.index
        )));
      }
      if item.embedding.len() != self.embedding_dim {
        return Err(EmbeddingError::DimensionMismatch {
          expected: self.embedding_dim,
          actual: item.embedding.len(),
        });
      }
      embeddings[item.index] = item.embedding;
    }

    Ok(embeddings)
  }

  fn embedding_dim(&self) -> usize {
    self.embedding_dim
  }

  fn max_batch_size(&self) -> usize {
    self.max_batch_size
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn provider_for(server: &MockServer, dim: usize) -> OpenAILikeEmbeddingProvider {
    OpenAILikeEmbeddingProvider::new(&OpenAILikeConfig {
      api_base: server.uri(),
      api_key: None,
      model: "test-embedding".to_string(),
      embedding_dim: dim,
      max_batch_size: 4,
    })
    .unwrap()
  }

  #[tokio::test]
  async fn embeds_batch_in_input_order() {
    let server = MockServer::start().await;
    // Out-of-order response indices must be restored.
    Mock::given(method("POST"))
      .and(path("/embeddings"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [
          {"index": 1, "embedding": [1.0, 1.0]},
          {"index": 0, "embedding": [0.0, 0.0]}
        ]
      })))
      .mount(&server)
      .await;

    let provider = provider_for(&server, 2);
    let embeddings = provider.embed(&["first", "second"]).await.unwrap();
    assert_eq!(embeddings[0], vec![0.0, 0.0]);
    assert_eq!(embeddings[1], vec![1.0, 1.0]);
  }

  #[tokio::test]
  async fn partial_response_is_a_count_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/embeddings"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [{"index": 0, "embedding": [0.5, 0.5]}]
      })))
      .mount(&server)
      .await;

    let provider = provider_for(&server, 2);
    let err = provider.embed(&["a", "b"]).await.unwrap_err();
    assert!(matches!(
      err,
      EmbeddingError::CountMismatch {
        expected: 2,
        actual: 1
      }
    ));
  }

  #[tokio::test]
  async fn wrong_dimension_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/embeddings"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [{"index": 0, "embedding": [0.5, 0.5, 0.5]}]
      })))
      .mount(&server)
      .await;

    let provider = provider_for(&server, 2);
    let err = provider.embed(&["a"]).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::DimensionMismatch { .. }));
  }

  #[tokio::test]
  async fn api_failure_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/embeddings"))
      .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
      .mount(&server)
      .await;

    let provider = provider_for(&server, 2);
    let err = provider.embed(&["a"]).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::ApiError(_)));
  }

  #[tokio::test]
  async fn oversized_batch_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let provider = provider_for(&server, 2);
    let texts = vec!["x"; 5];
    let err = provider.embed(&texts).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::BatchSizeExceeded { .. }));
  }
}
