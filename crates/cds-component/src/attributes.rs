use cds_config::StepStatus;
use serde::{Deserialize, Serialize};

/// What a component reports back for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepAttributes {
  pub status: StepStatus,
  /// Data later steps can reference as `steps.<name>`.
  #[serde(default)]
  pub response_data: serde_json::Value,
  #[serde(default)]
  pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl StepAttributes {
  pub fn success(response_data: serde_json::Value) -> Self {
    Self {
      status: StepStatus::Success,
      response_data,
      attributes: serde_json::Map::new(),
    }
  }

  pub fn failure(response_data: serde_json::Value) -> Self {
    Self {
      status: StepStatus::Failure,
      response_data,
      attributes: serde_json::Map::new(),
    }
  }

  pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.attributes.insert(key.into(), value.into());
    self
  }

  pub fn is_success(&self) -> bool {
    self.status == StepStatus::Success
  }

  /// The `error` attribute, if one was recorded.
  pub fn error_message(&self) -> Option<&str> {
    self.attributes.get("error").and_then(|v| v.as_str())
  }

  /// Append attributes from `other`, keeping existing keys.
  pub fn merge_attributes(&mut self, other: &StepAttributes) {
    for (key, value) in &other.attributes {
      self
        .attributes
        .entry(key.clone())
        .or_insert_with(|| value.clone());
    }
  }
}
