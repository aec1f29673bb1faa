//! Request/response envelope for one blueprint execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommonHeader {
  /// Correlation id of the request.
  pub request_id: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub sub_request_id: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub originator_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActionIdentifiers {
  pub blueprint_name: String,
  pub blueprint_version: String,
  /// Workflow to execute.
  pub action_name: String,
  #[serde(default = "default_mode")]
  pub mode: String,
}

fn default_mode() -> String {
  "sync".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionServiceInput {
  pub common_header: CommonHeader,
  pub action_identifiers: ActionIdentifiers,
  #[serde(default = "empty_object")]
  pub payload: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
  serde_json::Value::Object(serde_json::Map::new())
}

/// Overall status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
  Success,
  Failure,
  Cancelled,
}

impl ExecutionStatus {
  pub fn code(&self) -> u16 {
    match self {
      ExecutionStatus::Success => 200,
      ExecutionStatus::Failure => 500,
      ExecutionStatus::Cancelled => 499,
    }
  }
}

/// Outcome of a single step invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
  Success,
  Failure,
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Status {
  pub code: u16,
  pub execution_status: ExecutionStatus,
  pub message: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub error_messages: Vec<String>,
  pub event_type: String,
  pub timestamp: DateTime<Utc>,
}

impl Status {
  pub fn new(execution_status: ExecutionStatus, message: impl Into<String>) -> Self {
    let event_type = match execution_status {
      ExecutionStatus::Success => "EVENT_COMPONENT_EXECUTED",
      ExecutionStatus::Failure => "EVENT_COMPONENT_FAILURE",
      ExecutionStatus::Cancelled => "EVENT_COMPONENT_CANCELLED",
    };
    Self {
      code: execution_status.code(),
      execution_status,
      message: message.into(),
      error_messages: Vec::new(),
      event_type: event_type.to_string(),
      timestamp: Utc::now(),
    }
  }
}

/// Diagnostics for one step invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepRecord {
  pub step_name: String,
  pub node_template: String,
  /// 1-based invocation counter within the execution.
  pub invocation: usize,
  pub status: StepStatus,
  #[serde(default)]
  pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionServiceOutput {
  pub common_header: CommonHeader,
  pub action_identifiers: ActionIdentifiers,
  pub status: Status,
  #[serde(default = "empty_object")]
  pub payload: serde_json::Value,
  #[serde(default)]
  pub step_data: Vec<StepRecord>,
}

impl ExecutionServiceOutput {
  /// An output for `input` carrying only a status.
  pub fn from_input(input: &ExecutionServiceInput, status: Status) -> Self {
    Self {
      common_header: input.common_header.clone(),
      action_identifiers: input.action_identifiers.clone(),
      status,
      payload: empty_object(),
      step_data: Vec::new(),
    }
  }

  pub fn is_success(&self) -> bool {
    self.status.execution_status == ExecutionStatus::Success
  }
}
