use serde::{Deserialize, Serialize};

use crate::property::PropertyDefinition;

/// Resolution state of a single assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
  #[default]
  Pending,
  Success,
  Failure,
}

/// A request to resolve one named value from a prioritized chain of sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResourceAssignment {
  /// Unique within a request.
  pub name: String,

  /// Dictionary entry to resolve against. Defaults to `name`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dictionary_name: Option<String>,

  /// Primary source, e.g. "input", "default", "processor-db".
  pub dictionary_source: String,

  /// Additional sources tried in order after the primary one.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub fallback_sources: Vec<String>,

  /// Names of assignments that must resolve first.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub dependencies: Vec<String>,

  #[serde(default)]
  pub property: PropertyDefinition,

  #[serde(default)]
  pub status: AssignmentStatus,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl ResourceAssignment {
  /// Create a required string assignment resolved from `source`.
  pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      dictionary_name: None,
      dictionary_source: source.into(),
      fallback_sources: Vec::new(),
      dependencies: Vec::new(),
      property: PropertyDefinition::default(),
      status: AssignmentStatus::Pending,
      message: None,
    }
  }

  pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.dependencies = dependencies.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_fallbacks<I, S>(mut self, sources: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.fallback_sources = sources.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_property(mut self, property: PropertyDefinition) -> Self {
    self.property = property;
    self
  }

  pub fn dictionary_name(&self) -> &str {
    self.dictionary_name.as_deref().unwrap_or(&self.name)
  }

  /// Sources in the order they must be tried.
  pub fn source_chain(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.dictionary_source.as_str())
      .chain(self.fallback_sources.iter().map(String::as_str))
  }

  pub fn value(&self) -> Option<&serde_json::Value> {
    self.property.value.as_ref()
  }

  /// Record a resolved value.
  pub fn set_value(&mut self, value: serde_json::Value) {
    self.property.value = Some(value);
    self.status = AssignmentStatus::Success;
    self.message = None;
  }

  /// Record a failed resolution.
  pub fn set_failed(&mut self, message: impl Into<String>) {
    self.property.value = None;
    self.status = AssignmentStatus::Failure;
    self.message = Some(message.into());
  }
}
