//! Workflow execution.
//!
//! The `WorkflowExecutor` walks a workflow graph one step at a time. Each
//! step invocation goes through the phases of [`StepPhase`]: its inputs are
//! rendered and validated, its resource assignments resolved, and the bound
//! component processed. A failed step is recovered and the workflow follows
//! the step's failure transition.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use cds_component::{
  ComponentError, ComponentNode, ComponentRegistry, StepAttributes, StepContext,
};
use cds_config::{
  BlueprintDef, ExecutionServiceInput, ExecutionStatus, NodeTemplateDef, StepRecord, StepStatus,
};
use cds_resolution::{ResolutionContext, ResolveError, ResourceResolver};
use cds_workflow::{Transition, WorkflowGraph};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ExecutorConfig;
use crate::error::{ExecutionError, StepError};
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::input::resolve_inputs;
use crate::state::{ExecutionState, StepPhase, StepRun};

/// Result of a complete workflow execution.
#[derive(Debug)]
pub struct ExecutionResult {
  pub execution_id: String,
  pub status: ExecutionStatus,
  pub message: String,
  /// Errors of every failed step, recovered ones included, and the fatal
  /// error if there was one.
  pub error_messages: Vec<String>,
  /// One record per step invocation, in order.
  pub step_data: Vec<StepRecord>,
  /// Response data of the latest invocation of each step.
  pub steps: serde_json::Map<String, serde_json::Value>,
  /// Every resource value resolved during the execution.
  pub resources: serde_json::Map<String, serde_json::Value>,
  /// The error that stopped the execution early.
  pub fatal: Option<ExecutionError>,
}

impl ExecutionResult {
  pub fn is_success(&self) -> bool {
    self.status == ExecutionStatus::Success
  }
}

/// Result of a single step invocation.
#[derive(Debug)]
pub struct StepExecution {
  pub record: StepRecord,
  pub response_data: serde_json::Value,
  /// Resource values resolved for the step.
  pub resources: HashMap<String, serde_json::Value>,
  pub error: Option<StepError>,
}

impl StepExecution {
  pub fn status(&self) -> StepStatus {
    self.record.status
  }
}

/// How the validate/resolve/process part of a step ended.
enum Attempt {
  Succeeded(StepAttributes),
  Failed {
    error: StepError,
    attributes: Option<StepAttributes>,
  },
  Cancelled(StepError),
}

/// Executes blueprint workflows.
///
/// Generic over `N: ExecutionNotifier` to allow different notification
/// strategies. Use `WorkflowExecutor::new()` for no-op notifications or
/// `WorkflowExecutor::with_notifier()` to observe events.
pub struct WorkflowExecutor<N: ExecutionNotifier = NoopNotifier> {
  components: Arc<dyn ComponentRegistry>,
  resolver: Arc<ResourceResolver>,
  config: ExecutorConfig,
  notifier: N,
}

impl WorkflowExecutor<NoopNotifier> {
  pub fn new(
    components: Arc<dyn ComponentRegistry>,
    resolver: Arc<ResourceResolver>,
    config: ExecutorConfig,
  ) -> Self {
    Self::with_notifier(components, resolver, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> WorkflowExecutor<N> {
  pub fn with_notifier(
    components: Arc<dyn ComponentRegistry>,
    resolver: Arc<ResourceResolver>,
    config: ExecutorConfig,
    notifier: N,
  ) -> Self {
    Self {
      components,
      resolver,
      config,
      notifier,
    }
  }

  pub fn config(&self) -> &ExecutorConfig {
    &self.config
  }

  pub fn resolver(&self) -> &ResourceResolver {
    &self.resolver
  }

  /// Execute the workflow `graph` of `blueprint` for one request.
  ///
  /// Returns `Err` only when the request is rejected before any step runs;
  /// everything that happens once the first step starts is reported in the
  /// result.
  #[instrument(
    name = "execute_workflow",
    skip(self, blueprint, graph, input, cancel),
    fields(
      blueprint = %blueprint.name,
      version = %blueprint.version,
      action = %input.action_identifiers.action_name,
      request_id = %input.common_header.request_id,
    )
  )]
  pub async fn execute(
    &self,
    blueprint: &BlueprintDef,
    graph: &WorkflowGraph,
    input: &ExecutionServiceInput,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, ExecutionError> {
    let action = &input.action_identifiers.action_name;
    let payload = prepare_payload(blueprint, action, &input.payload)?;
    self.preflight(blueprint, graph).await?;

    let execution_id = uuid::Uuid::new_v4().to_string();
    let mut state = ExecutionState::new(execution_id.clone(), payload);

    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      blueprint_name: blueprint.name.clone(),
      action_name: action.clone(),
    });
    info!(execution_id = %execution_id, entry = %graph.entry_point(), "workflow_started");

    let mut current = Some(graph.entry_point().to_string());
    let mut last_status = StepStatus::Success;
    let mut fatal = None;

    while let Some(step_name) = current.take() {
      if cancel.is_cancelled() {
        last_status = StepStatus::Cancelled;
        break;
      }

      let invocation = match state.begin_invocation(&step_name, &self.config) {
        Ok(invocation) => invocation,
        Err(e) => {
          warn!(execution_id = %execution_id, step = %step_name, error = %e, "step_refused");
          fatal = Some(e);
          break;
        }
      };

      let Some(target) = graph.step(&step_name).map(|s| s.target.clone()) else {
        break;
      };
      let Some(template) = blueprint.node_template(&target) else {
        fatal = Some(ExecutionError::UnknownNodeTemplate {
          step: step_name,
          node_template: target,
        });
        break;
      };

      let ctx = StepContext {
        execution_id: execution_id.clone(),
        request_id: input.common_header.request_id.clone(),
        blueprint_name: blueprint.name.clone(),
        blueprint_version: blueprint.version.clone(),
        action_name: action.clone(),
        step_name: step_name.clone(),
        node_template: target,
        invocation,
        payload: state.payload().clone(),
        resources: serde_json::Value::Null,
      };

      let execution = match self
        .invoke_step(ctx, template, state.template_context(), cancel)
        .await
      {
        Ok(execution) => execution,
        Err(e) => {
          fatal = Some(e);
          break;
        }
      };

      state.merge_resources(&execution.resources);
      state
        .step_outputs
        .insert(step_name.clone(), execution.response_data.clone());
      if let Some(error) = &execution.error {
        state.errors.push(error.to_string());
      }
      last_status = execution.status();
      state.records.push(execution.record);

      let transition = match last_status {
        StepStatus::Success => Transition::Success,
        StepStatus::Failure => Transition::Failure,
        StepStatus::Cancelled => break,
      };
      current = graph.next(&step_name, transition).map(str::to_string);
      if let Some(next) = &current {
        debug!(from = %step_name, to = %next, transition = ?transition, "step_transition");
      }
    }

    debug!(invocations = state.invocations(), "workflow_loop_finished");
    Ok(self.finish(state, last_status, fatal))
  }

  /// Run one node template in isolation, outside any workflow.
  pub async fn execute_step(
    &self,
    blueprint: &BlueprintDef,
    node_template: &str,
    input: &ExecutionServiceInput,
    cancel: &CancellationToken,
  ) -> Result<StepExecution, ExecutionError> {
    let template =
      blueprint
        .node_template(node_template)
        .ok_or_else(|| ExecutionError::UnknownNodeTemplate {
          step: node_template.to_string(),
          node_template: node_template.to_string(),
        })?;
    self.check_assignments(node_template, template).await?;

    let ctx = StepContext {
      execution_id: uuid::Uuid::new_v4().to_string(),
      request_id: input.common_header.request_id.clone(),
      blueprint_name: blueprint.name.clone(),
      blueprint_version: blueprint.version.clone(),
      action_name: input.action_identifiers.action_name.clone(),
      step_name: node_template.to_string(),
      node_template: node_template.to_string(),
      invocation: 1,
      payload: input.payload.clone(),
      resources: serde_json::Value::Null,
    };
    let context = json!({ "inputs": input.payload, "resources": {}, "steps": {} });

    self.invoke_step(ctx, template, context, cancel).await
  }

  /// Reject the request before any side effect: every reachable step must
  /// target a node template whose assignments can be ordered.
  async fn preflight(
    &self,
    blueprint: &BlueprintDef,
    graph: &WorkflowGraph,
  ) -> Result<(), ExecutionError> {
    let mut checked = HashSet::new();
    for step_name in graph.reachable() {
      let Some(step) = graph.step(step_name) else {
        continue;
      };
      if !checked.insert(step.target.as_str()) {
        continue;
      }
      let template =
        blueprint
          .node_template(&step.target)
          .ok_or_else(|| ExecutionError::UnknownNodeTemplate {
            step: step.name.clone(),
            node_template: step.target.clone(),
          })?;
      self.check_assignments(&step.target, template).await?;
    }
    Ok(())
  }

  async fn check_assignments(
    &self,
    name: &str,
    template: &NodeTemplateDef,
  ) -> Result<(), ExecutionError> {
    if template.assignments.is_empty() {
      return Ok(());
    }
    self
      .resolver
      .plan(&template.assignments)
      .await
      .map(|_| ())
      .map_err(|e| ExecutionError::InvalidAssignments {
        node_template: name.to_string(),
        source: e,
      })
  }

  /// Drive one step invocation through its phases.
  #[instrument(
    name = "invoke_step",
    skip(self, ctx, template, context, cancel),
    fields(step = %ctx.step_name, invocation = ctx.invocation)
  )]
  async fn invoke_step(
    &self,
    mut ctx: StepContext,
    template: &NodeTemplateDef,
    mut context: serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<StepExecution, ExecutionError> {
    let step = ctx.step_name.clone();
    let mut run = StepRun::new(&step);

    self.notifier.notify(ExecutionEvent::StepStarted {
      execution_id: ctx.execution_id.clone(),
      step: step.clone(),
      invocation: ctx.invocation,
    });
    info!(component = %template.component, "step_started");
    run.advance(StepPhase::Validating);

    let Some(component) = self.components.get(&template.component) else {
      let error = StepError::ComponentNotFound {
        step: step.clone(),
        component: template.component.clone(),
      };
      run.advance(StepPhase::Failure);
      self.notify_failed(&ctx, &error);
      return Ok(step_execution(
        &ctx,
        StepStatus::Failure,
        None,
        HashMap::new(),
        Some(error),
      ));
    };

    let mut inputs = serde_json::Value::Object(serde_json::Map::new());
    let mut resources = HashMap::new();
    let attempt = self
      .attempt(
        component.as_ref(),
        &mut ctx,
        template,
        &mut context,
        &mut inputs,
        &mut resources,
        &mut run,
        cancel,
      )
      .await?;

    Ok(match attempt {
      Attempt::Succeeded(attributes) => {
        run.advance(StepPhase::Success);
        self.notifier.notify(ExecutionEvent::StepCompleted {
          execution_id: ctx.execution_id.clone(),
          step: step.clone(),
          data: attributes.response_data.clone(),
        });
        info!("step_completed");
        step_execution(&ctx, StepStatus::Success, Some(attributes), resources, None)
      }
      Attempt::Failed { error, attributes } => {
        run.advance(StepPhase::Failure);
        self.notify_failed(&ctx, &error);

        run.advance(StepPhase::Recovering);
        let recovered = component.recover(&error, &ctx, &inputs).await;
        self.notifier.notify(ExecutionEvent::StepRecovered {
          execution_id: ctx.execution_id.clone(),
          step: step.clone(),
        });
        debug!(phase = ?run.phase(), "step_recovered");

        let mut attributes =
          attributes.unwrap_or_else(|| StepAttributes::failure(serde_json::Value::Null));
        attributes.merge_attributes(&recovered);
        step_execution(&ctx, StepStatus::Failure, Some(attributes), resources, Some(error))
      }
      Attempt::Cancelled(error) => {
        info!("step_cancelled");
        step_execution(&ctx, StepStatus::Cancelled, None, resources, Some(error))
      }
    })
  }

  /// Validate, resolve and process. Phases up to `Processing` are advanced
  /// here; the caller advances to the terminal phase.
  #[allow(clippy::too_many_arguments)]
  async fn attempt(
    &self,
    component: &dyn ComponentNode,
    ctx: &mut StepContext,
    template: &NodeTemplateDef,
    context: &mut serde_json::Value,
    inputs: &mut serde_json::Value,
    resources: &mut HashMap<String, serde_json::Value>,
    run: &mut StepRun<'_>,
    cancel: &CancellationToken,
  ) -> Result<Attempt, ExecutionError> {
    let step = ctx.step_name.clone();

    *inputs = match resolve_inputs(&step, &template.inputs, context) {
      Ok(inputs) => inputs,
      Err(error) => {
        return Ok(Attempt::Failed {
          error,
          attributes: None,
        });
      }
    };

    if let Err(source) = component.validate(ctx, inputs) {
      return Ok(Attempt::Failed {
        error: StepError::Validation { step, source },
        attributes: None,
      });
    }

    run.advance(StepPhase::Processing);

    if !template.assignments.is_empty() {
      let resolution_context = ResolutionContext::new(ctx.request_id.clone(), ctx.payload.clone())
        .with_blueprint(ctx.blueprint_name.clone(), ctx.blueprint_version.clone());

      let outcome = match self
        .resolver
        .resolve(&template.assignments, &resolution_context, cancel)
        .await
      {
        Ok(outcome) => outcome,
        Err(ResolveError::Cancelled) => return Ok(Attempt::Cancelled(StepError::Cancelled { step })),
        Err(ResolveError::Dictionary(e)) => {
          return Ok(Attempt::Failed {
            error: StepError::Resolution {
              step,
              failures: vec![e.to_string()],
            },
            attributes: None,
          });
        }
        Err(e) => {
          return Err(ExecutionError::InvalidAssignments {
            node_template: ctx.node_template.clone(),
            source: e,
          });
        }
      };

      *resources = outcome.values.clone();
      if !outcome.is_success() {
        return Ok(Attempt::Failed {
          error: StepError::Resolution {
            step,
            failures: outcome.failure_messages(),
          },
          attributes: None,
        });
      }

      // Re-render so inputs see this step's own resources.
      ctx.resources = outcome.values_json();
      if let Some(known) = context.get_mut("resources").and_then(|r| r.as_object_mut()) {
        for (name, value) in &outcome.values {
          known.insert(name.clone(), value.clone());
        }
      }
      *inputs = match resolve_inputs(&step, &template.inputs, context) {
        Ok(inputs) => inputs,
        Err(error) => {
          return Ok(Attempt::Failed {
            error,
            attributes: None,
          });
        }
      };
    }

    // Cancelled on timeout so blocking work the component handed off stops too.
    let attempt_cancel = cancel.child_token();
    let timeout_ms = template.timeout_ms.unwrap_or(self.config.step_timeout_ms);
    let processed = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Ok(Attempt::Cancelled(StepError::Cancelled { step })),
      result = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        component.process(ctx, inputs, &attempt_cancel),
      ) => result,
    };

    Ok(match processed {
      Err(_) => {
        attempt_cancel.cancel();
        Attempt::Failed {
          error: StepError::Timeout { step, timeout_ms },
          attributes: None,
        }
      }
      Ok(Err(ComponentError::Cancelled)) => Attempt::Cancelled(StepError::Cancelled { step }),
      Ok(Err(e)) => Attempt::Failed {
        error: StepError::Processing {
          step,
          message: e.to_string(),
        },
        attributes: None,
      },
      Ok(Ok(attributes)) if attributes.is_success() => Attempt::Succeeded(attributes),
      Ok(Ok(attributes)) => Attempt::Failed {
        error: StepError::Processing {
          step,
          message: attributes
            .error_message()
            .unwrap_or("component reported failure")
            .to_string(),
        },
        attributes: Some(attributes),
      },
    })
  }

  fn notify_failed(&self, ctx: &StepContext, error: &StepError) {
    warn!(error = %error, "step_failed");
    self.notifier.notify(ExecutionEvent::StepFailed {
      execution_id: ctx.execution_id.clone(),
      step: ctx.step_name.clone(),
      error: error.to_string(),
    });
  }

  fn finish(
    &self,
    state: ExecutionState,
    last_status: StepStatus,
    fatal: Option<ExecutionError>,
  ) -> ExecutionResult {
    let ExecutionState {
      execution_id,
      records,
      step_outputs,
      resources,
      mut errors,
      ..
    } = state;

    let (status, message) = match (&fatal, last_status) {
      (Some(e), _) => {
        errors.push(e.to_string());
        (ExecutionStatus::Failure, e.to_string())
      }
      (None, StepStatus::Success) => (
        ExecutionStatus::Success,
        "workflow completed successfully".to_string(),
      ),
      (None, StepStatus::Failure) => (
        ExecutionStatus::Failure,
        errors
          .last()
          .cloned()
          .unwrap_or_else(|| "workflow failed".to_string()),
      ),
      (None, StepStatus::Cancelled) => (ExecutionStatus::Cancelled, "execution cancelled".to_string()),
    };

    match &fatal {
      Some(e) => {
        warn!(execution_id = %execution_id, error = %e, "workflow_failed");
        self.notifier.notify(ExecutionEvent::WorkflowFailed {
          execution_id: execution_id.clone(),
          error: e.to_string(),
        });
      }
      None => {
        info!(
          execution_id = %execution_id,
          status = ?status,
          steps = records.len(),
          "workflow_completed"
        );
        self.notifier.notify(ExecutionEvent::WorkflowCompleted {
          execution_id: execution_id.clone(),
          status,
        });
      }
    }

    ExecutionResult {
      execution_id,
      status,
      message,
      error_messages: errors,
      step_data: records,
      steps: step_outputs,
      resources,
      fatal,
    }
  }
}

/// Fill declared workflow inputs from their defaults and check required ones.
fn prepare_payload(
  blueprint: &BlueprintDef,
  action: &str,
  payload: &serde_json::Value,
) -> Result<serde_json::Value, ExecutionError> {
  let workflow = blueprint
    .workflow(action)
    .ok_or_else(|| ExecutionError::UnknownAction {
      blueprint: blueprint.name.clone(),
      action: action.to_string(),
    })?;

  let mut payload = match payload {
    serde_json::Value::Object(map) => map.clone(),
    serde_json::Value::Null => serde_json::Map::new(),
    other => return Ok(other.clone()),
  };

  let mut names: Vec<&String> = workflow.inputs.keys().collect();
  names.sort();
  for name in names {
    let property = &workflow.inputs[name];
    if payload.get(name).is_some_and(|v| !v.is_null()) {
      continue;
    }
    match &property.default {
      Some(default) => {
        payload.insert(name.clone(), default.clone());
      }
      None if property.required => {
        return Err(ExecutionError::MissingInput { name: name.clone() });
      }
      None => {}
    }
  }

  Ok(serde_json::Value::Object(payload))
}

fn step_execution(
  ctx: &StepContext,
  status: StepStatus,
  attributes: Option<StepAttributes>,
  resources: HashMap<String, serde_json::Value>,
  error: Option<StepError>,
) -> StepExecution {
  let (response_data, mut record_attributes) = match attributes {
    Some(attributes) => (attributes.response_data, attributes.attributes),
    None => (serde_json::Value::Null, serde_json::Map::new()),
  };
  if !response_data.is_null() {
    record_attributes.insert("response-data".to_string(), response_data.clone());
  }
  if let Some(error) = &error {
    record_attributes.insert("error".to_string(), json!(error.to_string()));
  }

  StepExecution {
    record: StepRecord {
      step_name: ctx.step_name.clone(),
      node_template: ctx.node_template.clone(),
      invocation: ctx.invocation,
      status,
      attributes: record_attributes,
    },
    response_data,
    resources,
    error,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cds_config::{PropertyDefinition, WorkflowDef};

  fn blueprint(inputs: HashMap<String, PropertyDefinition>) -> BlueprintDef {
    let mut workflows = HashMap::new();
    workflows.insert(
      "deploy".to_string(),
      WorkflowDef {
        description: String::new(),
        inputs,
        steps: vec![],
      },
    );
    BlueprintDef {
      name: "vFW".to_string(),
      version: "1.0.0".to_string(),
      description: String::new(),
      workflows,
      node_templates: HashMap::new(),
    }
  }

  #[test]
  fn test_prepare_payload_defaults_and_required() {
    let mut inputs = HashMap::new();
    let mut region = PropertyDefinition::of_type("string");
    region.default = Some(json!("us-east"));
    inputs.insert("region".to_string(), region);
    inputs.insert("hostname".to_string(), PropertyDefinition::of_type("string"));
    let mut optional = PropertyDefinition::of_type("string");
    optional.required = false;
    inputs.insert("note".to_string(), optional);
    let blueprint = blueprint(inputs);

    let payload = prepare_payload(&blueprint, "deploy", &json!({ "hostname": "fw-1" })).unwrap();
    assert_eq!(payload, json!({ "hostname": "fw-1", "region": "us-east" }));

    assert!(matches!(
      prepare_payload(&blueprint, "deploy", &json!({})),
      Err(ExecutionError::MissingInput { name }) if name == "hostname"
    ));
    assert!(matches!(
      prepare_payload(&blueprint, "undeploy", &json!({})),
      Err(ExecutionError::UnknownAction { .. })
    ));
  }
}
