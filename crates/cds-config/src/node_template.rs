use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::assignment::ResourceAssignment;
use crate::input::InputValue;

/// A node template is the target of a workflow step: the component to drive,
/// its inputs, and the resources it needs resolved first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeTemplateDef {
  /// Component registry key, e.g. "component-netconf".
  pub component: String,

  #[serde(default)]
  pub inputs: HashMap<String, InputValue>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub assignments: Vec<ResourceAssignment>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}
