use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::node_template::NodeTemplateDef;
use crate::workflow::WorkflowDef;

/// A versioned blueprint: workflows keyed by action name plus the node
/// templates their steps target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BlueprintDef {
  pub name: String,
  pub version: String,

  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,

  #[serde(default)]
  pub workflows: HashMap<String, WorkflowDef>,

  #[serde(default)]
  pub node_templates: HashMap<String, NodeTemplateDef>,
}

impl BlueprintDef {
  pub fn workflow(&self, action_name: &str) -> Option<&WorkflowDef> {
    self.workflows.get(action_name)
  }

  pub fn node_template(&self, name: &str) -> Option<&NodeTemplateDef> {
    self.node_templates.get(name)
  }
}
