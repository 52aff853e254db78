use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Task, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("queue connection fault: {0}")]
  Connection(String),

  #[error("status serialization failed")]
  Serialization(#[from] serde_json::Error),
}

/// One message claimed from the task queue. The tag identifies the delivery
/// for ack/reject on the owning connection.
#[derive(Debug, Clone)]
pub struct Delivery {
  pub delivery_tag: u64,
  pub payload: Vec<u8>,
}

/// Terminal and intermediate status reports sent to the result queue.
/// CamelCase on the wire to match the producer's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
  pub task_id: Uuid,
  pub status: TaskStatus,
  pub date_time: DateTime<Utc>,

  /// Human-readable detail; always present on FAILED.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chunk_count: Option<usize>,

  /// Stable error-kind string, present only on FAILED.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_kind: Option<String>,
}

impl StatusMessage {
  pub fn processing(task_id: Uuid) -> Self {
    Self {
      task_id,
      status: TaskStatus::Processing,
      date_time: Utc::now(),
      detail: None,
      chunk_count: None,
      error_kind: None,
    }
  }

  pub fn success(task_id: Uuid, chunk_count: usize, detail: Option<String>) -> Self {
    Self {
      task_id,
      status: TaskStatus::Success,
      date_time: Utc::now(),
      detail,
      chunk_count: Some(chunk_count),
      error_kind: None,
    }
  }

  pub fn failed(task_id: Uuid, error_kind: impl Into<String>, reason: impl Into<String>) -> Self {
    Self {
      task_id,
      status: TaskStatus::Failed,
      date_time: Utc::now(),
      detail: Some(reason.into()),
      chunk_count: None,
      error_kind: Some(error_kind.into()),
    }
  }
}

/// Boundary to the message queue. Only the consumer's receive loop may call
/// these methods; workers hand their completions back over a channel instead
/// of touching the connection.
#[async_trait]
pub trait QueueTransport: Send + Sync {
  /// Next delivery from the task queue; `None` once the queue is closed.
  async fn recv(&self) -> Option<Delivery>;

  /// Acknowledge a delivery; the queue will not redeliver it.
  async fn ack(&self, delivery_tag: u64) -> Result<(), TransportError>;

  /// Reject a delivery without requeueing it.
  async fn reject(&self, delivery_tag: u64) -> Result<(), TransportError>;

  /// Publish a status message to the result queue.
  async fn publish_status(&self, status: &StatusMessage) -> Result<(), TransportError>;
}

/// In-process transport backed by flume channels, for tests and local
/// deployments. `LocalQueueHandle` is the producer/observer side.
pub struct LocalQueue {
  deliveries: flume::Receiver<Delivery>,
  statuses: flume::Sender<StatusMessage>,
  acked: Arc<Mutex<Vec<u64>>>,
  rejected: Arc<Mutex<Vec<u64>>>,
}

pub struct LocalQueueHandle {
  deliveries: flume::Sender<Delivery>,
  next_tag: AtomicU64,
  statuses: flume::Receiver<StatusMessage>,
  acked: Arc<Mutex<Vec<u64>>>,
  rejected: Arc<Mutex<Vec<u64>>>,
}

impl LocalQueue {
  pub fn channel() -> (LocalQueueHandle, LocalQueue) {
    let (delivery_tx, delivery_rx) = flume::unbounded();
    let (status_tx, status_rx) = flume::unbounded();
    let acked = Arc::new(Mutex::new(Vec::new()));
    let rejected = Arc::new(Mutex::new(Vec::new()));
    (
      LocalQueueHandle {
        deliveries: delivery_tx,
        next_tag: AtomicU64::new(1),
        statuses: status_rx,
        acked: acked.clone(),
        rejected: rejected.clone(),
      },
      LocalQueue {
        deliveries: delivery_rx,
        statuses: status_tx,
        acked,
        rejected,
      },
    )
  }
}

#[async_trait]
impl QueueTransport for LocalQueue {
  async fn recv(&self) -> Option<Delivery> {
    self.deliveries.recv_async().await.ok()
  }

  async fn ack(&self, delivery_tag: u64) -> Result<(), TransportError> {
    self
      .acked
      .lock()
      .map_err(|_| TransportError::Connection("ack registry poisoned".into()))?
      .push(delivery_tag);
    Ok(())
  }

  async fn reject(&self, delivery_tag: u64) -> Result<(), TransportError> {
    self
      .rejected
      .lock()
      .map_err(|_| TransportError::Connection("reject registry poisoned".into()))?
      .push(delivery_tag);
    Ok(())
  }

  async fn publish_status(&self, status: &StatusMessage) -> Result<(), TransportError> {
    self
      .statuses
      .send(status.clone())
      .map_err(|_| TransportError::Connection("result queue closed".into()))
  }
}

impl LocalQueueHandle {
  /// Enqueue a raw payload, returning its delivery tag.
  pub fn enqueue(&self, payload: Vec<u8>) -> Result<u64, TransportError> {
    let tag = self.next_tag.fetch_add(1, Ordering::SeqCst);
    self
      .deliveries
      .send(Delivery {
        delivery_tag: tag,
        payload,
      })
      .map_err(|_| TransportError::Connection("task queue closed".into()))?;
    Ok(tag)
  }

  pub fn enqueue_task(&self, task: &Task) -> Result<u64, TransportError> {
    self.enqueue(serde_json::to_vec(task)?)
  }

  /// Receive the next published status, waiting up to `timeout`.
  pub async fn next_status(
    &self,
    timeout: std::time::Duration,
  ) -> Option<StatusMessage> {
    tokio::time::timeout(timeout, self.statuses.recv_async())
      .await
      .ok()?
      .ok()
  }

  pub fn try_next_status(&self) -> Option<StatusMessage> {
    self.statuses.try_recv().ok()
  }

  pub fn acked(&self) -> Vec<u64> {
    self.acked.lock().map(|v| v.clone()).unwrap_or_default()
  }

  pub fn rejected(&self) -> Vec<u64> {
    self.rejected.lock().map(|v| v.clone()).unwrap_or_default()
  }
}
