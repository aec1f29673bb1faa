use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::property::PropertyDefinition;

/// A declarative workflow: named steps with success/failure transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkflowDef {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,

  /// Declared request inputs. Required inputs must be present in the payload.
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub inputs: HashMap<String, PropertyDefinition>,

  pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepDef {
  pub name: String,

  /// Node template executed by this step.
  pub target: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub on_success: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub on_failure: Vec<String>,

  /// Explicit entry marker. Only needed when the entry step has incoming edges.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub start: bool,
}

impl StepDef {
  pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      target: target.into(),
      description: String::new(),
      on_success: Vec::new(),
      on_failure: Vec::new(),
      start: false,
    }
  }

  pub fn on_success(mut self, next: impl Into<String>) -> Self {
    self.on_success.push(next.into());
    self
  }

  pub fn on_failure(mut self, next: impl Into<String>) -> Self {
    self.on_failure.push(next.into());
    self
  }

  pub fn start(mut self) -> Self {
    self.start = true;
    self
  }
}
