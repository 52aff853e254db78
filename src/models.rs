mod chunk;
mod document;
mod task;

pub use chunk::{Chunk, ChunkRecord};
pub use document::Document;
pub use task::{Task, TaskStatus};
