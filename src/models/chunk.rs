use serde::{Deserialize, Serialize};

/// An ordered text segment of a parsed document. Offsets are byte offsets
/// into the parsed text; `index` is the stable sequence position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
  pub index: usize,
  pub start: usize,
  pub end: usize,
  pub text: String,
}

impl Chunk {
  pub fn len(&self) -> usize {
    self.text.len()
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }
}

/// One vector-store row: chunk text, its embedding and enough metadata to
/// replace prior rows for the same document on reprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
  pub document_id: String,
  pub chunk_index: usize,
  pub text: String,
  pub vector: Vec<f32>,
  pub start_offset: usize,
  pub end_offset: usize,
}

impl ChunkRecord {
  pub fn from_chunk(document_id: &str, chunk: &Chunk, vector: Vec<f32>) -> Self {
    Self {
      document_id: document_id.to_string(),
      chunk_index: chunk.index,
      text: chunk.text.clone(),
      vector,
      start_offset: chunk.start,
      end_offset: chunk.end,
    }
  }
}
