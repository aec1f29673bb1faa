#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cds_component::{
  ComponentError, ComponentNode, InMemoryComponentRegistry, StepAttributes, StepContext,
};
use cds_config::{
  ActionIdentifiers, BlueprintDef, CommonHeader, ExecutionServiceInput, NodeTemplateDef,
  ResourceAssignment, StepDef, WorkflowDef,
};
use cds_dictionary::InMemoryDictionary;
use cds_engine::{ExecutorConfig, WorkflowExecutor};
use cds_resolution::{ResourceResolver, SourceRegistry};
use tokio_util::sync::CancellationToken;

/// Counts calls per phase.
#[derive(Debug, Default)]
pub struct Calls {
  pub process: AtomicUsize,
  pub recover: AtomicUsize,
}

impl Calls {
  pub fn process(&self) -> usize {
    self.process.load(Ordering::SeqCst)
  }

  pub fn recover(&self) -> usize {
    self.recover.load(Ordering::SeqCst)
  }
}

/// Succeeds with its inputs as response data.
pub struct Echo {
  pub calls: Arc<Calls>,
}

#[async_trait]
impl ComponentNode for Echo {
  fn name(&self) -> &str {
    "component-echo"
  }

  async fn process(
    &self,
    _ctx: &StepContext,
    inputs: &serde_json::Value,
    _cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError> {
    self.calls.process.fetch_add(1, Ordering::SeqCst);
    Ok(StepAttributes::success(inputs.clone()))
  }
}

/// Reports failure and recovers with a marker attribute.
pub struct Fail {
  pub calls: Arc<Calls>,
}

#[async_trait]
impl ComponentNode for Fail {
  fn name(&self) -> &str {
    "component-fail"
  }

  fn validate(&self, _ctx: &StepContext, inputs: &serde_json::Value) -> Result<(), ComponentError> {
    if inputs.get("reject").is_some() {
      return Err(ComponentError::invalid_input("reject", "rejected by validation"));
    }
    Ok(())
  }

  async fn process(
    &self,
    _ctx: &StepContext,
    _inputs: &serde_json::Value,
    _cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError> {
    self.calls.process.fetch_add(1, Ordering::SeqCst);
    Ok(StepAttributes::failure(serde_json::json!({ "device": "down" })).with_attribute("error", "boom"))
  }

  async fn recover(
    &self,
    error: &(dyn std::error::Error + Send + Sync),
    _ctx: &StepContext,
    _inputs: &serde_json::Value,
  ) -> StepAttributes {
    self.calls.recover.fetch_add(1, Ordering::SeqCst);
    StepAttributes::failure(serde_json::Value::Null)
      .with_attribute("recovered", true)
      .with_attribute("cause", error.to_string())
  }
}

/// Sleeps for `ms` milliseconds, ignoring cancellation.
pub struct Sleep {
  pub calls: Arc<Calls>,
}

#[async_trait]
impl ComponentNode for Sleep {
  fn name(&self) -> &str {
    "component-sleep"
  }

  async fn process(
    &self,
    _ctx: &StepContext,
    inputs: &serde_json::Value,
    _cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError> {
    self.calls.process.fetch_add(1, Ordering::SeqCst);
    let ms = inputs.get("ms").and_then(|v| v.as_u64()).unwrap_or(10_000);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(StepAttributes::success(serde_json::Value::Null))
  }

  async fn recover(
    &self,
    _error: &(dyn std::error::Error + Send + Sync),
    _ctx: &StepContext,
    _inputs: &serde_json::Value,
  ) -> StepAttributes {
    self.calls.recover.fetch_add(1, Ordering::SeqCst);
    StepAttributes::failure(serde_json::Value::Null)
  }
}

pub fn registry(calls: &Arc<Calls>) -> Arc<InMemoryComponentRegistry> {
  let registry = InMemoryComponentRegistry::new();
  registry.register(Echo {
    calls: calls.clone(),
  });
  registry.register(Fail {
    calls: calls.clone(),
  });
  registry.register(Sleep {
    calls: calls.clone(),
  });
  Arc::new(registry)
}

pub fn resolver() -> Arc<ResourceResolver> {
  Arc::new(ResourceResolver::new(
    Arc::new(InMemoryDictionary::new()),
    SourceRegistry::with_builtin(),
  ))
}

pub fn executor(calls: &Arc<Calls>, config: ExecutorConfig) -> WorkflowExecutor {
  WorkflowExecutor::new(registry(calls), resolver(), config)
}

pub fn template(component: &str, inputs: serde_json::Value) -> NodeTemplateDef {
  NodeTemplateDef {
    component: component.to_string(),
    inputs: serde_json::from_value(inputs).unwrap(),
    assignments: vec![],
    timeout_ms: None,
  }
}

pub fn with_assignments(mut template: NodeTemplateDef, assignments: Vec<ResourceAssignment>) -> NodeTemplateDef {
  template.assignments = assignments;
  template
}

pub fn blueprint(steps: Vec<StepDef>, templates: Vec<(&str, NodeTemplateDef)>) -> BlueprintDef {
  let mut workflows = HashMap::new();
  workflows.insert(
    "deploy".to_string(),
    WorkflowDef {
      description: String::new(),
      inputs: HashMap::new(),
      steps,
    },
  );
  BlueprintDef {
    name: "vFW".to_string(),
    version: "1.0.0".to_string(),
    description: String::new(),
    workflows,
    node_templates: templates
      .into_iter()
      .map(|(name, template)| (name.to_string(), template))
      .collect(),
  }
}

pub fn input(payload: serde_json::Value) -> ExecutionServiceInput {
  ExecutionServiceInput {
    common_header: CommonHeader {
      request_id: "req-1".to_string(),
      ..CommonHeader::default()
    },
    action_identifiers: ActionIdentifiers {
      blueprint_name: "vFW".to_string(),
      blueprint_version: "1.0.0".to_string(),
      action_name: "deploy".to_string(),
      mode: "sync".to_string(),
    },
    payload,
  }
}
