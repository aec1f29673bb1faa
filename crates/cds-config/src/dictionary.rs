use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::property::PropertyDefinition;

/// A resource dictionary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResourceDefinition {
  pub name: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  #[serde(default)]
  pub property: PropertyDefinition,

  /// Source name -> source definition, e.g. "primary-db" -> source-db.
  #[serde(default)]
  pub sources: HashMap<String, SourceDefinition>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub key_dependencies: Vec<String>,
}

/// How one source of a dictionary entry is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDefinition {
  /// Evaluator key, e.g. "source-db", "source-rest".
  #[serde(rename = "type")]
  pub source_type: String,

  /// Evaluator specific configuration.
  #[serde(default = "empty_object")]
  pub properties: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
  serde_json::Value::Object(serde_json::Map::new())
}

impl SourceDefinition {
  pub fn new(source_type: impl Into<String>, properties: serde_json::Value) -> Self {
    Self {
      source_type: source_type.into(),
      properties,
    }
  }

  /// The `key-dependencies` declared in the source properties.
  pub fn key_dependencies(&self) -> Vec<String> {
    self
      .properties
      .get("key-dependencies")
      .and_then(|v| v.as_array())
      .map(|deps| {
        deps
          .iter()
          .filter_map(|d| d.as_str().map(str::to_string))
          .collect()
      })
      .unwrap_or_default()
  }
}

impl ResourceDefinition {
  pub fn source(&self, name: &str) -> Option<&SourceDefinition> {
    self.sources.get(name)
  }
}
