use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reference to a source document held in object storage (or on the local
/// filesystem when no storage backend is configured).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  /// Bucket hint from the producer. Routing derives the bucket from the key
  /// shape, so this is informational only.
  #[serde(default, alias = "sourceBucket", alias = "bucket")]
  pub source_bucket: Option<String>,

  /// Object key of the source document, e.g. `"report.pdf"`.
  #[serde(alias = "sourceKey", alias = "fileName")]
  pub source_key: String,
}

impl Document {
  pub fn new(source_key: impl Into<String>) -> Self {
    Self {
      source_bucket: None,
      source_key: source_key.into(),
    }
  }

  /// Stable document identifier: the file stem of the source key.
  pub fn doc_id(&self) -> String {
    Path::new(&self.source_key)
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.source_key.clone())
  }

  /// Object key under which the parsed text is persisted. Its presence in
  /// the preprocessed bucket is the authoritative cache-skip signal.
  pub fn parsed_text_key(&self) -> String {
    format!("{}/text.txt", self.doc_id())
  }
}
