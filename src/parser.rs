use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
  #[error("layout model failed: {0}")]
  Model(String),

  #[error("document content is not valid text: {0}")]
  InvalidText(String),

  #[error("unsupported document format: {0}")]
  UnsupportedFormat(String),
}

/// Boundary to the layout-detection/parsing model. Takes the raw source
/// bytes, returns the extracted text. Implementations must tolerate
/// concurrent invocation from multiple workers.
#[async_trait]
pub trait DocumentParser: Send + Sync {
  async fn parse(&self, source: &[u8]) -> Result<String, ParseError>;
}

/// Trivial parser for plain-text documents; also the default in local-only
/// deployments where no layout model is available.
pub struct PlainTextParser;

#[async_trait]
impl DocumentParser for PlainTextParser {
  async fn parse(&self, source: &[u8]) -> Result<String, ParseError> {
    String::from_utf8(source.to_vec()).map_err(|e| ParseError::InvalidText(e.to_string()))
  }
}
