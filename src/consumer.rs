use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt as _;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::Task;
use crate::pipeline::{PipelineOutput, PipelineRegistry};
use crate::queue::{Delivery, QueueTransport, StatusMessage};

/// Terminal outcome of one worker, handed back to the receive loop. Workers
/// never touch the queue connection; acking and status publishing happen on
/// the loop that owns it.
enum Completion {
  Succeeded {
    delivery_tag: u64,
    task_id: Uuid,
    output: PipelineOutput,
  },
  Failed {
    delivery_tag: u64,
    task_id: Uuid,
    kind: String,
    reason: String,
  },
}

/// Pulls task messages, resolves pipelines through the registry and executes
/// them on a bounded worker pool.
///
/// The receive loop is the only place the transport is used. It blocks only
/// on pool capacity: a pool full of slow tasks delays new dispatches but
/// completions and shutdown stay serviced.
pub struct TaskConsumer {
  transport: Arc<dyn QueueTransport>,
  registry: Arc<PipelineRegistry>,
  workers: usize,
}

impl TaskConsumer {
  pub fn new(
    transport: Arc<dyn QueueTransport>,
    registry: Arc<PipelineRegistry>,
    workers: usize,
  ) -> Self {
    Self {
      transport,
      registry,
      workers: workers.max(1),
    }
  }

  /// Consume until the queue closes or `shutdown` fires. Tasks already
  /// dispatched run to their terminal state and are reported before this
  /// returns; there is no cancellation of in-flight work.
  pub async fn run(&self, shutdown: CancellationToken) {
    let semaphore = Arc::new(Semaphore::new(self.workers));
    let (completion_tx, completion_rx) = flume::unbounded::<Completion>();
    let mut in_flight: usize = 0;

    info!(workers = self.workers, "Task consumer started");

    loop {
      tokio::select! {
        _ = shutdown.cancelled() => {
          info!(in_flight, "Task consumer shutting down");
          break;
        }
        completion = completion_rx.recv_async() => {
          if let Ok(completion) = completion {
            in_flight -= 1;
            self.finish(completion).await;
          }
        }
        claimed = Self::claim(&semaphore, self.transport.as_ref()) => {
          match claimed {
            Some((permit, delivery)) => {
              if self.dispatch(delivery, permit, completion_tx.clone()).await {
                in_flight += 1;
              }
            }
            None => {
              info!("Task queue closed");
              break;
            }
          }
        }
      }
    }

    while in_flight > 0 {
      match completion_rx.recv_async().await {
        Ok(completion) => {
          in_flight -= 1;
          self.finish(completion).await;
        }
        Err(_) => break,
      }
    }
  }

  /// Wait for pool capacity, then for the next delivery. Dropping this
  /// future (when another select branch wins) releases the permit.
  async fn claim(
    semaphore: &Arc<Semaphore>,
    transport: &dyn QueueTransport,
  ) -> Option<(OwnedSemaphorePermit, Delivery)> {
    let permit = semaphore.clone().acquire_owned().await.ok()?;
    let delivery = transport.recv().await?;
    Some((permit, delivery))
  }

  /// Validate and hand a delivery to a worker. Returns whether a worker was
  /// spawned; malformed or unknown-type messages are rejected here without
  /// any status message. Runs on the receive loop, so transport calls stay
  /// on the owning connection.
  async fn dispatch(
    &self,
    delivery: Delivery,
    permit: OwnedSemaphorePermit,
    completion_tx: flume::Sender<Completion>,
  ) -> bool {
    let delivery_tag = delivery.delivery_tag;

    let task: Task = match serde_json::from_slice(&delivery.payload) {
      Ok(task) => task,
      Err(e) => {
        warn!(delivery_tag, error = %e, "Rejecting malformed task payload");
        self.reject(delivery_tag).await;
        return false;
      }
    };

    let Some(pipeline) = self.registry.resolve(&task.task_type) else {
      warn!(
        task_id = %task.task_id,
        task_type = task.task_type,
        "Rejecting task with unknown type"
      );
      self.reject(delivery_tag).await;
      return false;
    };

    // Published before execution begins so observers can tell
    // queued-but-unstarted from in-flight work.
    self
      .publish(StatusMessage::processing(task.task_id))
      .await;

    info!(task_id = %task.task_id, task_type = task.task_type, "Dispatching task");

    tokio::spawn(async move {
      let _permit = permit;
      let task_id = task.task_id;
      let result = AssertUnwindSafe(pipeline.process(&task)).catch_unwind().await;
      let completion = match result {
        Ok(Ok(output)) => Completion::Succeeded {
          delivery_tag,
          task_id,
          output,
        },
        Ok(Err(e)) => {
          error!(task_id = %task_id, error = %e, kind = e.kind(), "Pipeline failed");
          Completion::Failed {
            delivery_tag,
            task_id,
            kind: e.kind().to_string(),
            reason: e.to_string(),
          }
        }
        Err(panic) => {
          let reason = panic_reason(panic);
          error!(task_id = %task_id, reason, "Pipeline worker panicked");
          Completion::Failed {
            delivery_tag,
            task_id,
            kind: "InternalError".to_string(),
            reason,
          }
        }
      };
      let _ = completion_tx.send_async(completion).await;
    });
    true
  }

  /// Report one terminal outcome. The inbound message is acknowledged for
  /// both outcomes: stage failures are terminal, and requeueing a task
  /// doomed to fail the same way only builds a poison loop.
  async fn finish(&self, completion: Completion) {
    match completion {
      Completion::Succeeded {
        delivery_tag,
        task_id,
        output,
      } => {
        if let Err(e) = self.transport.ack(delivery_tag).await {
          error!(task_id = %task_id, error = %e, "Failed to ack completed task");
        }
        let detail = output
          .parsed_text
          .as_ref()
          .map(|reference| format!("parsed text at {reference}"));
        self
          .publish(StatusMessage::success(task_id, output.chunk_count, detail))
          .await;
        info!(task_id = %task_id, chunk_count = output.chunk_count, "Task completed");
      }
      Completion::Failed {
        delivery_tag,
        task_id,
        kind,
        reason,
      } => {
        if let Err(e) = self.transport.ack(delivery_tag).await {
          error!(task_id = %task_id, error = %e, "Failed to ack failed task");
        }
        self
          .publish(StatusMessage::failed(task_id, kind, reason))
          .await;
      }
    }
  }

  async fn reject(&self, delivery_tag: u64) {
    if let Err(e) = self.transport.reject(delivery_tag).await {
      error!(delivery_tag, error = %e, "Failed to reject delivery");
    }
  }

  async fn publish(&self, status: StatusMessage) {
    if let Err(e) = self.transport.publish_status(&status).await {
      error!(task_id = %status.task_id, error = %e, "Failed to publish status");
    }
  }
}

fn panic_reason(panic: Box<dyn std::any::Any + Send>) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "worker panicked".to_string()
  }
}
