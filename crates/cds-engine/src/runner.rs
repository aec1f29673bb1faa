//! Execution runner with channel-based submission.
//!
//! The `ExecutionRunner` owns an mpsc channel of requests and runs each one
//! on its own task, so independent executions proceed concurrently.

use std::sync::Arc;

use cds_config::{ExecutionServiceInput, ExecutionServiceOutput};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ExecutionError;
use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::service::ExecutionService;

struct ExecutionRequest {
  input: ExecutionServiceInput,
  reply: oneshot::Sender<ExecutionServiceOutput>,
}

/// Cloneable handle for submitting requests to a running
/// [`ExecutionRunner`].
#[derive(Clone)]
pub struct ExecutionHandle {
  sender: mpsc::Sender<ExecutionRequest>,
}

impl ExecutionHandle {
  /// Submit a request and wait for its output.
  pub async fn execute(
    &self,
    input: ExecutionServiceInput,
  ) -> Result<ExecutionServiceOutput, ExecutionError> {
    let (reply, response) = oneshot::channel();
    self
      .sender
      .send(ExecutionRequest { input, reply })
      .await
      .map_err(|_| ExecutionError::RunnerClosed)?;
    response.await.map_err(|_| ExecutionError::RunnerClosed)
  }

  pub fn is_closed(&self) -> bool {
    self.sender.is_closed()
  }
}

/// Runs submitted executions until cancelled.
///
/// ```ignore
/// let runner = ExecutionRunner::new(Arc::new(service));
/// let handle = runner.handle();
///
/// let cancel = CancellationToken::new();
/// tokio::spawn(runner.start(cancel.clone()));
///
/// let output = handle.execute(input).await?;
/// ```
pub struct ExecutionRunner<N: ExecutionNotifier = NoopNotifier> {
  sender: mpsc::Sender<ExecutionRequest>,
  receiver: mpsc::Receiver<ExecutionRequest>,
  service: Arc<ExecutionService<N>>,
}

impl<N: ExecutionNotifier + 'static> ExecutionRunner<N> {
  pub fn new(service: Arc<ExecutionService<N>>) -> Self {
    Self::with_buffer_size(service, 100)
  }

  pub fn with_buffer_size(service: Arc<ExecutionService<N>>, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      service,
    }
  }

  pub fn handle(&self) -> ExecutionHandle {
    ExecutionHandle {
      sender: self.sender.clone(),
    }
  }

  pub fn service(&self) -> &ExecutionService<N> {
    &self.service
  }

  /// Run the submission loop until `cancel` fires or every handle is
  /// dropped. Each request runs under a child token of `cancel`, which is
  /// also cancelled when the submitter stops waiting for the output. In-flight
  /// executions are awaited before returning.
  pub async fn start(self, cancel: CancellationToken) -> Result<(), ExecutionError> {
    let ExecutionRunner {
      sender,
      mut receiver,
      service,
    } = self;
    drop(sender);

    info!("execution_runner_started");
    let mut tasks = JoinSet::new();

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!("execution_runner_cancelled");
          break;
        }
        Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
          if let Err(e) = joined {
            error!(error = %e, "execution_task_failed");
          }
        }
        request = receiver.recv() => {
          let Some(ExecutionRequest { input, mut reply }) = request else {
            info!("execution_runner_channel_closed");
            break;
          };

          let service = service.clone();
          let exec_cancel = cancel.child_token();
          tasks.spawn(async move {
            let request_id = input.common_header.request_id.clone();
            let execution = service.execute_with_cancel(input, &exec_cancel);
            tokio::pin!(execution);

            let output = tokio::select! {
              output = &mut execution => output,
              _ = reply.closed() => {
                info!(request_id = %request_id, "execution_client_disconnected");
                exec_cancel.cancel();
                execution.await
              }
            };
            // The submitter may have gone away.
            let _ = reply.send(output);
          });
        }
      }
    }

    while let Some(joined) = tasks.join_next().await {
      if let Err(e) = joined {
        error!(error = %e, "execution_task_failed");
      }
    }

    Ok(())
  }
}
