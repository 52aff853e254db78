use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Document;

/// Lifecycle of a task. Transitions are monotonic; `Success` and `Failed`
/// are terminal and published at most once per task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
  Pending,
  Processing,
  Success,
  Failed,
}

impl TaskStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, TaskStatus::Success | TaskStatus::Failed)
  }
}

impl std::fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      TaskStatus::Pending => "PENDING",
      TaskStatus::Processing => "PROCESSING",
      TaskStatus::Success => "SUCCESS",
      TaskStatus::Failed => "FAILED",
    };
    f.write_str(s)
  }
}

/// A unit of work pulled off the task queue. Immutable once enqueued; owned
/// by the executing worker for the rest of its lifetime.
///
/// The producer side emits camelCase field names, so every field accepts the
/// aliased spelling as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
  #[serde(alias = "taskId")]
  pub task_id: Uuid,

  /// Selects the pipeline via the registry. There is no default: an unknown
  /// or missing type is rejected before any pipeline is constructed.
  #[serde(alias = "taskType")]
  pub task_type: String,

  pub document: Document,

  /// Target collection override; falls back to the configured default.
  #[serde(default, alias = "destinationCollection")]
  pub collection: Option<String>,

  /// Target partition override within the collection.
  #[serde(default, alias = "destinationPartition")]
  pub partition: Option<String>,

  #[serde(default = "Utc::now", alias = "createdAt")]
  pub created_at: DateTime<Utc>,
}

impl Task {
  pub fn new(task_type: impl Into<String>, document: Document) -> Self {
    Self {
      task_id: Uuid::new_v4(),
      task_type: task_type.into(),
      document,
      collection: None,
      partition: None,
      created_at: Utc::now(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deserializes_spec_payload() {
    let payload = r#"{
      "task_id": "a9f0c9a4-13a8-4b6e-9d3e-7d2a8f6b1c01",
      "task_type": "pdf_default",
      "document": {"source_bucket": "docs", "source_key": "x.pdf"}
    }"#;
    let task: Task = serde_json::from_str(payload).unwrap();
    assert_eq!(task.task_type, "pdf_default");
    assert_eq!(task.document.source_key, "x.pdf");
    assert_eq!(task.document.source_bucket.as_deref(), Some("docs"));
    assert!(task.collection.is_none());
  }

  #[test]
  fn deserializes_camel_case_aliases() {
    let payload = r#"{
      "taskId": "a9f0c9a4-13a8-4b6e-9d3e-7d2a8f6b1c01",
      "taskType": "pdf_default",
      "document": {"sourceKey": "report.pdf"},
      "destinationCollection": "articles"
    }"#;
    let task: Task = serde_json::from_str(payload).unwrap();
    assert_eq!(task.task_type, "pdf_default");
    assert_eq!(task.collection.as_deref(), Some("articles"));
  }

  #[test]
  fn missing_task_type_is_an_error() {
    let payload = r#"{
      "taskId": "a9f0c9a4-13a8-4b6e-9d3e-7d2a8f6b1c01",
      "document": {"sourceKey": "report.pdf"}
    }"#;
    assert!(serde_json::from_str::<Task>(payload).is_err());
  }

  #[test]
  fn status_terminality() {
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Processing.is_terminal());
    assert!(TaskStatus::Success.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
  }

  #[test]
  fn status_wire_format_is_screaming() {
    assert_eq!(
      serde_json::to_string(&TaskStatus::Processing).unwrap(),
      "\"PROCESSING\""
    );
  }
}
