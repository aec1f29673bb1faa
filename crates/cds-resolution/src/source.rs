use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cds_config::{DataType, ResourceAssignment, ResourceDefinition, SourceDefinition};

use crate::error::SourceError;
use crate::sources::{DefaultSource, InputSource};

/// Outcome of a source call that did not hard-fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
  Resolved(serde_json::Value),
  /// The source has no value for this assignment. Resolution falls through to
  /// the next source of the chain.
  NotFound,
}

/// Request-scoped data available to every source.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
  pub request_id: String,
  pub blueprint_name: String,
  pub blueprint_version: String,
  /// Request input payload.
  pub payload: serde_json::Value,
}

impl ResolutionContext {
  pub fn new(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
    Self {
      request_id: request_id.into(),
      payload,
      ..Self::default()
    }
  }

  pub fn with_blueprint(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
    self.blueprint_name = name.into();
    self.blueprint_version = version.into();
    self
  }
}

/// Everything a source needs to evaluate one assignment.
#[derive(Debug, Clone, Copy)]
pub struct SourceRequest<'a> {
  pub assignment: &'a ResourceAssignment,
  /// Dictionary definition, if the dictionary has one.
  pub definition: Option<&'a ResourceDefinition>,
  /// Source name being tried, e.g. "processor-db".
  pub source_name: &'a str,
  /// Source definition from the dictionary. Absent for built-in sources that
  /// the dictionary does not declare.
  pub source: Option<&'a SourceDefinition>,
  /// Values of the assignments resolved so far.
  pub resolved: &'a HashMap<String, serde_json::Value>,
  pub context: &'a ResolutionContext,
}

impl<'a> SourceRequest<'a> {
  /// Source properties, or `Null` when there is no source definition.
  pub fn properties(&self) -> &'a serde_json::Value {
    static NULL: serde_json::Value = serde_json::Value::Null;
    self.source.map(|s| &s.properties).unwrap_or(&NULL)
  }

  pub fn property_str(&self, key: &str) -> Option<&'a str> {
    self.properties().get(key).and_then(|v| v.as_str())
  }

  /// Declared type of the assignment.
  pub fn data_type(&self) -> DataType {
    self.assignment.property.data_type()
  }
}

/// A pluggable resource source.
#[async_trait]
pub trait SourceEvaluator: Send + Sync {
  /// Evaluator key matched against a dictionary source `type`.
  fn source_type(&self) -> &str;

  /// Produce a value for the assignment. Evaluators only read.
  async fn evaluate(&self, request: SourceRequest<'_>) -> Result<SourceValue, SourceError>;
}

/// Evaluators keyed by source type.
#[derive(Clone, Default)]
pub struct SourceRegistry {
  evaluators: HashMap<String, Arc<dyn SourceEvaluator>>,
}

impl SourceRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the `input` and `default` evaluators.
  pub fn with_builtin() -> Self {
    let mut registry = Self::new();
    registry.register(InputSource);
    registry.register(DefaultSource);
    registry
  }

  /// Register an evaluator under its source type, replacing any previous one.
  pub fn register<E: SourceEvaluator + 'static>(&mut self, evaluator: E) {
    self.register_arc(Arc::new(evaluator));
  }

  pub fn register_arc(&mut self, evaluator: Arc<dyn SourceEvaluator>) {
    self
      .evaluators
      .insert(evaluator.source_type().to_string(), evaluator);
  }

  pub fn get(&self, source_type: &str) -> Option<Arc<dyn SourceEvaluator>> {
    self.evaluators.get(source_type).cloned()
  }

  pub fn contains(&self, source_type: &str) -> bool {
    self.evaluators.contains_key(source_type)
  }

  /// Registered source types, sorted.
  pub fn source_types(&self) -> Vec<String> {
    let mut types: Vec<String> = self.evaluators.keys().cloned().collect();
    types.sort();
    types
  }
}

impl std::fmt::Debug for SourceRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SourceRegistry")
      .field("source_types", &self.source_types())
      .finish()
  }
}
