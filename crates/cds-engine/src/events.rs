//! Execution events and notifiers for observability.
//!
//! Events are emitted while a workflow runs so consumers can observe
//! progress, persist audit records or stream to a UI.

use cds_config::ExecutionStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  WorkflowStarted {
    execution_id: String,
    blueprint_name: String,
    action_name: String,
  },

  StepStarted {
    execution_id: String,
    step: String,
    invocation: usize,
  },

  StepCompleted {
    execution_id: String,
    step: String,
    data: serde_json::Value,
  },

  StepFailed {
    execution_id: String,
    step: String,
    error: String,
  },

  /// `recover` ran for a failed step.
  StepRecovered { execution_id: String, step: String },

  /// The workflow reached a terminal step or was cancelled.
  WorkflowCompleted {
    execution_id: String,
    status: ExecutionStatus,
  },

  /// The execution stopped on a fatal error.
  WorkflowFailed { execution_id: String, error: String },
}

/// Receives execution events. Implementations decide what to do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Sends events to an unbounded channel so a slow consumer never blocks an
/// execution.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // The receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
