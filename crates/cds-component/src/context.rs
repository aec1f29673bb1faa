use serde::{Deserialize, Serialize};

/// Identity and request data of the step invocation a component runs in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepContext {
  pub execution_id: String,
  pub request_id: String,
  pub blueprint_name: String,
  pub blueprint_version: String,
  pub action_name: String,
  pub step_name: String,
  pub node_template: String,
  /// 1-based invocation counter within the execution.
  pub invocation: usize,
  /// Request input payload.
  pub payload: serde_json::Value,
  /// Resource values resolved for this step.
  pub resources: serde_json::Value,
}

impl StepContext {
  pub fn new(execution_id: impl Into<String>, step_name: impl Into<String>) -> Self {
    Self {
      execution_id: execution_id.into(),
      step_name: step_name.into(),
      ..Self::default()
    }
  }

  /// The context as a JSON value, as handed to scripts.
  pub fn to_json(&self) -> serde_json::Value {
    serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
  }
}
