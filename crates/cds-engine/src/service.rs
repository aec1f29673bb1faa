use std::sync::Arc;

use cds_config::{ExecutionServiceInput, ExecutionServiceOutput, ExecutionStatus, Status};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::cache::{GraphCache, GraphKey};
use crate::catalog::BlueprintCatalog;
use crate::error::ExecutionError;
use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::executor::{ExecutionResult, WorkflowExecutor};

/// Entry point for blueprint executions. Loads the blueprint, builds (or
/// reuses) the workflow graph of the requested action and runs it.
pub struct ExecutionService<N: ExecutionNotifier = NoopNotifier> {
  catalog: Arc<dyn BlueprintCatalog>,
  executor: WorkflowExecutor<N>,
  graphs: GraphCache,
}

impl<N: ExecutionNotifier> ExecutionService<N> {
  pub fn new(catalog: Arc<dyn BlueprintCatalog>, executor: WorkflowExecutor<N>) -> Self {
    Self {
      catalog,
      executor,
      graphs: GraphCache::new(),
    }
  }

  pub fn executor(&self) -> &WorkflowExecutor<N> {
    &self.executor
  }

  pub fn graphs(&self) -> &GraphCache {
    &self.graphs
  }

  /// Execute a request. Never fails: every error is folded into the output
  /// status.
  pub async fn execute(&self, input: ExecutionServiceInput) -> ExecutionServiceOutput {
    self.execute_with_cancel(input, &CancellationToken::new()).await
  }

  #[instrument(
    name = "execution_service",
    skip(self, input, cancel),
    fields(
      request_id = %input.common_header.request_id,
      blueprint = %input.action_identifiers.blueprint_name,
      action = %input.action_identifiers.action_name,
    )
  )]
  pub async fn execute_with_cancel(
    &self,
    input: ExecutionServiceInput,
    cancel: &CancellationToken,
  ) -> ExecutionServiceOutput {
    match self.run(&input, cancel).await {
      Ok(result) => output_from_result(&input, result),
      Err(e) => {
        warn!(error = %e, "execution_rejected");
        let execution_status = match e {
          ExecutionError::Cancelled => ExecutionStatus::Cancelled,
          _ => ExecutionStatus::Failure,
        };
        let mut status = Status::new(execution_status, e.to_string());
        status.error_messages.push(e.to_string());
        ExecutionServiceOutput::from_input(&input, status)
      }
    }
  }

  async fn run(
    &self,
    input: &ExecutionServiceInput,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, ExecutionError> {
    if cancel.is_cancelled() {
      return Err(ExecutionError::Cancelled);
    }

    let ids = &input.action_identifiers;
    let blueprint = self
      .catalog
      .load(&ids.blueprint_name, &ids.blueprint_version)
      .await?;
    let workflow =
      blueprint
        .workflow(&ids.action_name)
        .ok_or_else(|| ExecutionError::UnknownAction {
          blueprint: blueprint.name.clone(),
          action: ids.action_name.clone(),
        })?;

    let key = GraphKey::new(&blueprint.name, &blueprint.version, &ids.action_name);
    let graph =
      self
        .graphs
        .get_or_build(&key, workflow)
        .map_err(|e| ExecutionError::InvalidWorkflow {
          action: ids.action_name.clone(),
          source: e,
        })?;

    self.executor.execute(&blueprint, &graph, input, cancel).await
  }
}

fn output_from_result(input: &ExecutionServiceInput, result: ExecutionResult) -> ExecutionServiceOutput {
  let mut status = Status::new(result.status, result.message);
  status.error_messages = result.error_messages;

  let mut output = ExecutionServiceOutput::from_input(input, status);
  output.step_data = result.step_data;
  let mut payload = serde_json::Map::new();
  payload.insert(
    format!("{}-response", input.action_identifiers.action_name),
    json!({
      "execution-id": result.execution_id,
      "resources": result.resources,
      "steps": result.steps,
    }),
  );
  output.payload = serde_json::Value::Object(payload);
  output
}
