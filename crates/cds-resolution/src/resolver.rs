use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use cds_config::{ResourceAssignment, ResourceDefinition, SourceDefinition};
use cds_dictionary::ResourceDictionary;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::coerce::coerce_value;
use crate::error::{AssignmentFailure, ResolveError, SourceError};
use crate::sequence::{effective_dependencies, sequence_batches, topological_order};
use crate::source::{ResolutionContext, SourceRegistry, SourceRequest, SourceValue};
use crate::sources::builtin_source_type;

/// Resolution policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
  /// Upper bound of a single source call.
  pub source_timeout_ms: u64,
  /// Fall through to the next source on a hard source error instead of
  /// failing the assignment.
  pub continue_on_source_error: bool,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      source_timeout_ms: 30_000,
      continue_on_source_error: false,
    }
  }
}

/// Result of resolving one set of assignments.
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
  /// Assignment names in the order they were resolved.
  pub order: Vec<String>,
  /// The assignments in declaration order, with values and statuses set.
  pub assignments: Vec<ResourceAssignment>,
  /// Resolved values keyed by assignment name.
  pub values: HashMap<String, serde_json::Value>,
  pub failures: Vec<AssignmentFailure>,
}

impl ResolutionOutcome {
  /// Every assignment resolved or is non-required.
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn value(&self, name: &str) -> Option<&serde_json::Value> {
    self.values.get(name)
  }

  /// Values as a JSON object, for templating.
  pub fn values_json(&self) -> serde_json::Value {
    serde_json::Value::Object(
      self
        .values
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
    )
  }

  pub fn failure_messages(&self) -> Vec<String> {
    self.failures.iter().map(|f| f.to_string()).collect()
  }
}

/// Resolves resource assignments against the dictionary and the registered
/// source evaluators.
#[derive(Clone)]
pub struct ResourceResolver {
  dictionary: Arc<dyn ResourceDictionary>,
  registry: SourceRegistry,
  config: ResolverConfig,
}

/// How one source of the chain is evaluated.
enum SourcePlan<'a> {
  Evaluate {
    source_type: String,
    source: Option<&'a SourceDefinition>,
  },
  Missing(AssignmentFailure),
}

impl ResourceResolver {
  pub fn new(dictionary: Arc<dyn ResourceDictionary>, registry: SourceRegistry) -> Self {
    Self::with_config(dictionary, registry, ResolverConfig::default())
  }

  pub fn with_config(
    dictionary: Arc<dyn ResourceDictionary>,
    registry: SourceRegistry,
    config: ResolverConfig,
  ) -> Self {
    Self {
      dictionary,
      registry,
      config,
    }
  }

  pub fn config(&self) -> &ResolverConfig {
    &self.config
  }

  pub fn registry(&self) -> &SourceRegistry {
    &self.registry
  }

  /// Compute the resolution order without calling any source.
  ///
  /// Fails on duplicate names, unknown declared dependencies and cycles.
  pub async fn plan(&self, assignments: &[ResourceAssignment]) -> Result<Vec<String>, ResolveError> {
    let definitions = self.load_definitions(assignments).await?;
    let (order, _) = Self::order(assignments, &definitions)?;
    Ok(
      order
        .into_iter()
        .map(|i| assignments[i].name.clone())
        .collect(),
    )
  }

  /// Resolve every assignment.
  ///
  /// Returns `Err` only for request-level failures (cycle, unknown dependency,
  /// duplicate name, dictionary error, cancellation); per-assignment failures
  /// are reported in the outcome.
  #[instrument(
    name = "resolve_assignments",
    skip(self, assignments, context, cancel),
    fields(request_id = %context.request_id, assignments = assignments.len())
  )]
  pub async fn resolve(
    &self,
    assignments: &[ResourceAssignment],
    context: &ResolutionContext,
    cancel: &CancellationToken,
  ) -> Result<ResolutionOutcome, ResolveError> {
    if cancel.is_cancelled() {
      return Err(ResolveError::Cancelled);
    }

    let definitions = self.load_definitions(assignments).await?;
    let (order, dependencies) = Self::order(assignments, &definitions)?;

    let ordered: Vec<&ResourceAssignment> = order.iter().map(|&i| &assignments[i]).collect();
    let batches = sequence_batches(&ordered, &dependencies);
    debug!(batches = ?batches, "resolution_plan");

    let mut working: Vec<ResourceAssignment> = assignments
      .iter()
      .cloned()
      .map(|mut ra| {
        ra.property.value = None;
        ra.status = Default::default();
        ra.message = None;
        ra
      })
      .collect();

    let mut outcome = ResolutionOutcome::default();
    let mut failed: HashSet<String> = HashSet::new();

    let index: HashMap<&str, usize> = assignments
      .iter()
      .enumerate()
      .map(|(i, a)| (a.name.as_str(), i))
      .collect();

    // Members of a batch never depend on each other, so they see the same
    // resolved values and run side by side.
    for batch in &batches {
      if cancel.is_cancelled() {
        return Err(ResolveError::Cancelled);
      }

      let members: Vec<usize> = batch
        .iter()
        .filter_map(|name| index.get(name.as_str()).copied())
        .collect();

      let resolved = &outcome.values;
      let blocked_by = &failed;
      let calls = members.iter().map(|&i| {
        let assignment = &assignments[i];
        let definition = definitions.get(assignment.dictionary_name());
        let blocked = dependencies
          .get(&assignment.name)
          .and_then(|deps| deps.iter().find(|d| blocked_by.contains(*d)))
          .cloned();

        async move {
          match blocked {
            Some(dependency) => Ok(Err(AssignmentFailure::DependencyFailed {
              name: assignment.name.clone(),
              dependency,
            })),
            None => {
              self
                .resolve_one(assignment, definition, resolved, context, cancel)
                .await
            }
          }
        }
      });
      let results = futures::future::join_all(calls).await;

      let mut newly_failed = Vec::new();
      for (&i, result) in members.iter().zip(results) {
        let assignment = &assignments[i];
        outcome.order.push(assignment.name.clone());

        match result? {
          Ok(value) => {
            debug!(assignment = %assignment.name, "assignment_resolved");
            working[i].set_value(value.clone());
            outcome.values.insert(assignment.name.clone(), value);
          }
          Err(failure) => {
            warn!(assignment = %assignment.name, error = %failure, "assignment_failed");
            working[i].set_failed(failure.to_string());
            newly_failed.push(assignment.name.clone());
            outcome.failures.push(failure);
          }
        }
      }
      failed.extend(newly_failed);
    }

    outcome.assignments = working;

    info!(
      resolved = outcome.values.len(),
      failed = outcome.failures.len(),
      "resolution_completed"
    );

    Ok(outcome)
  }

  /// Walk the source chain of one assignment.
  ///
  /// The outer `Result` carries request-level errors (cancellation); the inner
  /// one the assignment's own outcome.
  async fn resolve_one(
    &self,
    assignment: &ResourceAssignment,
    definition: Option<&ResourceDefinition>,
    resolved: &HashMap<String, serde_json::Value>,
    context: &ResolutionContext,
    cancel: &CancellationToken,
  ) -> Result<Result<serde_json::Value, AssignmentFailure>, ResolveError> {
    let mut tried = Vec::new();

    for source_name in assignment.source_chain() {
      let (source_type, source) = match Self::plan_source(assignment, definition, source_name) {
        SourcePlan::Evaluate {
          source_type,
          source,
        } => (source_type, source),
        SourcePlan::Missing(failure) => return Ok(Err(failure)),
      };

      let Some(evaluator) = self.registry.get(&source_type) else {
        return Ok(Err(AssignmentFailure::NoEvaluator {
          name: assignment.name.clone(),
          source_type,
        }));
      };

      let request = SourceRequest {
        assignment,
        definition,
        source_name,
        source,
        resolved,
        context,
      };

      let timeout_ms = self.config.source_timeout_ms;
      let call = tokio::time::timeout(Duration::from_millis(timeout_ms), evaluator.evaluate(request));

      let result = tokio::select! {
        _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
        result = call => match result {
          Ok(result) => result,
          Err(_) => Err(SourceError::Timeout { timeout_ms }),
        },
      };

      tried.push(source_name.to_string());

      let result = match result {
        Ok(SourceValue::Resolved(value)) if !value.is_null() => {
          coerce_value(value, &assignment.property.data_type()).map(SourceValue::Resolved)
        }
        other => other,
      };

      match result {
        Ok(SourceValue::Resolved(value)) if !value.is_null() => {
          debug!(
            assignment = %assignment.name,
            source = %source_name,
            "source_resolved"
          );
          return Ok(Ok(value));
        }
        Ok(_) => {
          debug!(
            assignment = %assignment.name,
            source = %source_name,
            "source_not_found"
          );
        }
        Err(error) if self.config.continue_on_source_error => {
          warn!(
            assignment = %assignment.name,
            source = %source_name,
            error = %error,
            "source_failed_continuing"
          );
        }
        Err(error) => {
          return Ok(Err(AssignmentFailure::SourceFailed {
            name: assignment.name.clone(),
            source_name: source_name.to_string(),
            error,
          }));
        }
      }
    }

    if assignment.property.required {
      Ok(Err(AssignmentFailure::Unresolved {
        name: assignment.name.clone(),
        tried,
      }))
    } else {
      Ok(Ok(serde_json::Value::Null))
    }
  }

  fn plan_source<'a>(
    assignment: &ResourceAssignment,
    definition: Option<&'a ResourceDefinition>,
    source_name: &str,
  ) -> SourcePlan<'a> {
    if let Some(source) = definition.and_then(|d| d.source(source_name)) {
      return SourcePlan::Evaluate {
        source_type: source.source_type.clone(),
        source: Some(source),
      };
    }

    match builtin_source_type(source_name) {
      Some(source_type) => SourcePlan::Evaluate {
        source_type: source_type.to_string(),
        source: None,
      },
      None => SourcePlan::Missing(AssignmentFailure::MissingDefinition {
        name: assignment.name.clone(),
        dictionary_name: assignment.dictionary_name().to_string(),
        source_name: source_name.to_string(),
      }),
    }
  }

  async fn load_definitions(
    &self,
    assignments: &[ResourceAssignment],
  ) -> Result<HashMap<String, ResourceDefinition>, ResolveError> {
    let names: Vec<String> = assignments
      .iter()
      .map(|a| a.dictionary_name().to_string())
      .collect();
    let lookup = self.dictionary.lookup_many(&names).await?;
    if !lookup.missing.is_empty() {
      debug!(missing = ?lookup.missing, "dictionary_definitions_missing");
    }
    Ok(lookup.found)
  }

  /// Topological order plus the effective dependencies of every assignment.
  ///
  /// Declared dependencies must name an assignment of the request; key
  /// dependencies contributed by the dictionary that do not are ignored.
  fn order(
    assignments: &[ResourceAssignment],
    definitions: &HashMap<String, ResourceDefinition>,
  ) -> Result<(Vec<usize>, HashMap<String, Vec<String>>), ResolveError> {
    let known: HashSet<&str> = assignments.iter().map(|a| a.name.as_str()).collect();

    let mut nodes = Vec::with_capacity(assignments.len());
    let mut dependencies = HashMap::with_capacity(assignments.len());

    for assignment in assignments {
      let definition = definitions.get(assignment.dictionary_name());
      let deps: Vec<String> = effective_dependencies(assignment, definition)
        .into_iter()
        .filter(|dep| {
          let keep = known.contains(dep.as_str()) || assignment.dependencies.contains(dep);
          if !keep {
            debug!(
              assignment = %assignment.name,
              dependency = %dep,
              "key_dependency_not_in_request"
            );
          }
          keep
        })
        .collect();

      nodes.push((assignment.name.clone(), deps.clone()));
      dependencies.insert(assignment.name.clone(), deps);
    }

    let order = topological_order(&nodes)?;
    Ok((order, dependencies))
  }
}

impl std::fmt::Debug for ResourceResolver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResourceResolver")
      .field("registry", &self.registry)
      .field("config", &self.config)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::source::SourceEvaluator;
  use async_trait::async_trait;
  use cds_config::{AssignmentStatus, PropertyDefinition};
  use cds_dictionary::InMemoryDictionary;
  use serde_json::json;

  struct CountingSource {
    calls: Arc<AtomicUsize>,
    value: SourceValue,
  }

  #[async_trait]
  impl SourceEvaluator for CountingSource {
    fn source_type(&self) -> &str {
      "source-counting"
    }

    async fn evaluate(&self, _request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.value.clone())
    }
  }

  struct FailingSource;

  #[async_trait]
  impl SourceEvaluator for FailingSource {
    fn source_type(&self) -> &str {
      "source-failing"
    }

    async fn evaluate(&self, _request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
      Err(SourceError::request("connection refused"))
    }
  }

  struct SlowSource;

  #[async_trait]
  impl SourceEvaluator for SlowSource {
    fn source_type(&self) -> &str {
      "source-slow"
    }

    async fn evaluate(&self, _request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
      tokio::time::sleep(Duration::from_secs(5)).await;
      Ok(SourceValue::Resolved(json!("late")))
    }
  }

  fn resolver(dictionary: InMemoryDictionary) -> ResourceResolver {
    ResourceResolver::new(Arc::new(dictionary), SourceRegistry::with_builtin())
  }

  fn context(payload: serde_json::Value) -> ResolutionContext {
    ResolutionContext::new("req-1", payload)
  }

  fn definition(name: &str, sources: serde_json::Value) -> ResourceDefinition {
    serde_json::from_value(json!({ "name": name, "sources": sources })).unwrap()
  }

  #[tokio::test]
  async fn test_resolves_from_input() {
    let resolver = resolver(InMemoryDictionary::new());
    let assignments = vec![ResourceAssignment::new("pnf-id", "input")];

    let outcome = resolver
      .resolve(
        &assignments,
        &context(json!({ "pnf-id": "abc" })),
        &CancellationToken::new(),
      )
      .await
      .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.value("pnf-id"), Some(&json!("abc")));
    assert_eq!(outcome.assignments[0].status, AssignmentStatus::Success);
    // The caller's assignments are left untouched.
    assert!(assignments[0].value().is_none());
  }

  #[tokio::test]
  async fn test_missing_input_is_unresolved() {
    let resolver = resolver(InMemoryDictionary::new());
    let assignments = vec![ResourceAssignment::new("pnf-id", "input")];

    let outcome = resolver
      .resolve(&assignments, &context(json!({})), &CancellationToken::new())
      .await
      .unwrap();

    assert!(!outcome.is_success());
    assert_eq!(
      outcome.failures,
      vec![AssignmentFailure::Unresolved {
        name: "pnf-id".to_string(),
        tried: vec!["input".to_string()],
      }]
    );
    assert_eq!(outcome.assignments[0].status, AssignmentStatus::Failure);
  }

  #[tokio::test]
  async fn test_optional_unresolved_is_null() {
    let resolver = resolver(InMemoryDictionary::new());
    let mut property = PropertyDefinition::default();
    property.required = false;
    let assignments = vec![ResourceAssignment::new("comment", "input").with_property(property)];

    let outcome = resolver
      .resolve(&assignments, &context(json!({})), &CancellationToken::new())
      .await
      .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.value("comment"), Some(&serde_json::Value::Null));
  }

  #[tokio::test]
  async fn test_falls_back_to_default_and_coerces() {
    let resolver = resolver(InMemoryDictionary::new());
    let mut property = PropertyDefinition::of_type("integer");
    property.default = Some(json!(830));
    let assignments = vec![
      ResourceAssignment::new("port", "input")
        .with_fallbacks(["default"])
        .with_property(property.clone()),
      ResourceAssignment::new("timeout", "input").with_property(PropertyDefinition::of_type("integer")),
    ];

    let outcome = resolver
      .resolve(
        &assignments,
        &context(json!({ "timeout": "30" })),
        &CancellationToken::new(),
      )
      .await
      .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.value("port"), Some(&json!(830)));
    assert_eq!(outcome.value("timeout"), Some(&json!(30)));
  }

  #[tokio::test]
  async fn test_cycle_resolves_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dictionary = InMemoryDictionary::from_definitions(vec![
      definition("a", json!({ "counting": { "type": "source-counting" } })),
      definition("b", json!({ "counting": { "type": "source-counting" } })),
    ]);
    let mut registry = SourceRegistry::with_builtin();
    registry.register(CountingSource {
      calls: calls.clone(),
      value: SourceValue::Resolved(json!("x")),
    });
    let resolver = ResourceResolver::new(Arc::new(dictionary), registry);

    let assignments = vec![
      ResourceAssignment::new("a", "counting").with_dependencies(["b"]),
      ResourceAssignment::new("b", "counting").with_dependencies(["a"]),
    ];

    let result = resolver
      .resolve(&assignments, &context(json!({})), &CancellationToken::new())
      .await;

    match result {
      Err(ResolveError::CyclicDependency { remaining }) => {
        assert_eq!(remaining, vec!["a", "b"]);
      }
      other => panic!("expected cycle, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_dependency_failure_skips_evaluators() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dictionary = InMemoryDictionary::from_definitions(vec![definition(
      "vnf-name",
      json!({ "counting": { "type": "source-counting" } }),
    )]);
    let mut registry = SourceRegistry::with_builtin();
    registry.register(CountingSource {
      calls: calls.clone(),
      value: SourceValue::Resolved(json!("fw")),
    });
    let resolver = ResourceResolver::new(Arc::new(dictionary), registry);

    let assignments = vec![
      ResourceAssignment::new("vnf-name", "counting").with_dependencies(["vnf-id"]),
      ResourceAssignment::new("vnf-id", "input"),
    ];

    let outcome = resolver
      .resolve(&assignments, &context(json!({})), &CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(outcome.order, vec!["vnf-id", "vnf-name"]);
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(
      outcome.failures[1],
      AssignmentFailure::DependencyFailed {
        name: "vnf-name".to_string(),
        dependency: "vnf-id".to_string(),
      }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_hard_error_policy() {
    let dictionary = || {
      InMemoryDictionary::from_definitions(vec![definition(
        "vnf-name",
        json!({ "failing": { "type": "source-failing" } }),
      )])
    };
    let mut registry = SourceRegistry::with_builtin();
    registry.register(FailingSource);

    let mut property = PropertyDefinition::default();
    property.default = Some(json!("fallback"));
    let assignments = vec![
      ResourceAssignment::new("vnf-name", "failing")
        .with_fallbacks(["default"])
        .with_property(property),
    ];

    let strict = ResourceResolver::new(Arc::new(dictionary()), registry.clone());
    let outcome = strict
      .resolve(&assignments, &context(json!({})), &CancellationToken::new())
      .await
      .unwrap();
    assert!(matches!(
      &outcome.failures[0],
      AssignmentFailure::SourceFailed { source_name, .. } if source_name == "failing"
    ));

    let lenient = ResourceResolver::with_config(
      Arc::new(dictionary()),
      registry,
      ResolverConfig {
        continue_on_source_error: true,
        ..ResolverConfig::default()
      },
    );
    let outcome = lenient
      .resolve(&assignments, &context(json!({})), &CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(outcome.value("vnf-name"), Some(&json!("fallback")));
  }

  #[tokio::test]
  async fn test_source_timeout_is_hard_failure() {
    let dictionary = InMemoryDictionary::from_definitions(vec![definition(
      "slow",
      json!({ "slow": { "type": "source-slow" } }),
    )]);
    let mut registry = SourceRegistry::with_builtin();
    registry.register(SlowSource);
    let resolver = ResourceResolver::with_config(
      Arc::new(dictionary),
      registry,
      ResolverConfig {
        source_timeout_ms: 20,
        ..ResolverConfig::default()
      },
    );

    let outcome = resolver
      .resolve(
        &[ResourceAssignment::new("slow", "slow")],
        &context(json!({})),
        &CancellationToken::new(),
      )
      .await
      .unwrap();

    assert!(matches!(
      &outcome.failures[0],
      AssignmentFailure::SourceFailed {
        error: SourceError::Timeout { timeout_ms: 20 },
        ..
      }
    ));
  }

  #[tokio::test]
  async fn test_missing_definition_and_evaluator() {
    let dictionary = InMemoryDictionary::from_definitions(vec![definition(
      "vnf-ip",
      json!({ "aai": { "type": "source-aai" } }),
    )]);
    let resolver = resolver(dictionary);
    let assignments = vec![
      ResourceAssignment::new("vnf-name", "processor-db"),
      ResourceAssignment::new("vnf-ip", "aai"),
    ];

    let outcome = resolver
      .resolve(&assignments, &context(json!({})), &CancellationToken::new())
      .await
      .unwrap();

    assert!(matches!(
      outcome.failures[0],
      AssignmentFailure::MissingDefinition { .. }
    ));
    assert!(matches!(
      &outcome.failures[1],
      AssignmentFailure::NoEvaluator { source_type, .. } if source_type == "source-aai"
    ));
  }

  #[tokio::test]
  async fn test_resolution_is_idempotent() {
    let resolver = resolver(InMemoryDictionary::new());
    let assignments = vec![
      ResourceAssignment::new("b", "input").with_dependencies(["a"]),
      ResourceAssignment::new("a", "input"),
      ResourceAssignment::new("c", "default"),
    ];
    let ctx = context(json!({ "a": 1, "b": "two" }));

    let first = resolver
      .resolve(&assignments, &ctx, &CancellationToken::new())
      .await
      .unwrap();
    let second = resolver
      .resolve(&first.assignments, &ctx, &CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(first.values, second.values);
    assert_eq!(first.order, second.order);
    assert_eq!(first.failures, second.failures);
  }

  #[tokio::test]
  async fn test_cancelled_before_start() {
    let resolver = resolver(InMemoryDictionary::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = resolver
      .resolve(
        &[ResourceAssignment::new("pnf-id", "input")],
        &context(json!({ "pnf-id": "abc" })),
        &cancel,
      )
      .await;
    assert!(matches!(result, Err(ResolveError::Cancelled)));
  }

  #[tokio::test]
  async fn test_plan_orders_without_evaluating() {
    let resolver = resolver(InMemoryDictionary::new());
    let plan = resolver
      .plan(&[
        ResourceAssignment::new("b", "input").with_dependencies(["a"]),
        ResourceAssignment::new("a", "input"),
      ])
      .await
      .unwrap();
    assert_eq!(plan, vec!["a", "b"]);
  }

  struct PausedSource;

  #[async_trait]
  impl SourceEvaluator for PausedSource {
    fn source_type(&self) -> &str {
      "source-paused"
    }

    async fn evaluate(&self, request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok(SourceValue::Resolved(json!(request.assignment.name)))
    }
  }

  #[tokio::test]
  async fn test_batch_members_resolve_concurrently() {
    let dictionary = InMemoryDictionary::from_definitions(
      ["a", "b", "c"]
        .into_iter()
        .map(|name| definition(name, json!({ "paused": { "type": "source-paused" } }))),
    );
    let mut registry = SourceRegistry::with_builtin();
    registry.register(PausedSource);
    let resolver = ResourceResolver::new(Arc::new(dictionary), registry);

    let started = std::time::Instant::now();
    let outcome = resolver
      .resolve(
        &[
          ResourceAssignment::new("a", "paused"),
          ResourceAssignment::new("b", "paused"),
          ResourceAssignment::new("c", "paused"),
        ],
        &context(json!({})),
        &CancellationToken::new(),
      )
      .await
      .unwrap();

    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(outcome.order, vec!["a", "b", "c"]);
    assert_eq!(outcome.value("c"), Some(&json!("c")));
  }
}
