use std::path::PathBuf;

use cds_component::ComponentError;
use cds_resolution::ResolveError;
use cds_workflow::WorkflowError;
use thiserror::Error;

/// Errors that end an execution. Everything except `LimitExceeded`,
/// `StepVisitLimitExceeded` and `Cancelled` is raised before the first step
/// runs.
#[derive(Debug, Error)]
pub enum ExecutionError {
  #[error("blueprint catalog error: {0}")]
  Catalog(#[from] CatalogError),

  #[error("blueprint '{blueprint}' has no workflow for action '{action}'")]
  UnknownAction { blueprint: String, action: String },

  #[error("invalid workflow '{action}': {source}")]
  InvalidWorkflow {
    action: String,
    #[source]
    source: WorkflowError,
  },

  #[error("required workflow input '{name}' is missing from the payload")]
  MissingInput { name: String },

  #[error("step '{step}' targets unknown node template '{node_template}'")]
  UnknownNodeTemplate { step: String, node_template: String },

  #[error("resource assignments of node template '{node_template}' are invalid: {source}")]
  InvalidAssignments {
    node_template: String,
    #[source]
    source: ResolveError,
  },

  #[error("step invocation limit of {limit} reached, refusing to run '{step}'")]
  LimitExceeded { limit: usize, step: String },

  #[error("step '{step}' reached its visit limit of {limit}")]
  StepVisitLimitExceeded { step: String, limit: usize },

  #[error("execution runner is not accepting requests")]
  RunnerClosed,

  #[error("execution cancelled")]
  Cancelled,
}

/// Errors of a single step invocation. They fail the step and are handed to
/// the component's `recover`; the workflow then follows `on_failure`.
#[derive(Debug, Error)]
pub enum StepError {
  #[error("step '{step}' validation failed: {source}")]
  Validation {
    step: String,
    #[source]
    source: ComponentError,
  },

  #[error("step '{step}' input resolution failed: {message}")]
  InputResolution { step: String, message: String },

  #[error("step '{step}' resource resolution failed: {}", failures.join("; "))]
  Resolution { step: String, failures: Vec<String> },

  #[error("step '{step}' processing failed: {message}")]
  Processing { step: String, message: String },

  #[error("step '{step}' timed out after {timeout_ms}ms")]
  Timeout { step: String, timeout_ms: u64 },

  #[error("step '{step}' cancelled")]
  Cancelled { step: String },

  #[error("step '{step}' uses unknown component '{component}'")]
  ComponentNotFound { step: String, component: String },
}

impl StepError {
  pub fn step(&self) -> &str {
    match self {
      StepError::Validation { step, .. }
      | StepError::InputResolution { step, .. }
      | StepError::Resolution { step, .. }
      | StepError::Processing { step, .. }
      | StepError::Timeout { step, .. }
      | StepError::Cancelled { step }
      | StepError::ComponentNotFound { step, .. } => step,
    }
  }
}

/// Errors raised while loading blueprints.
#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("blueprint not found: {name}/{version}")]
  NotFound { name: String, version: String },

  #[error("invalid blueprint identifier: {value}")]
  InvalidIdentifier { value: String },

  #[error("invalid blueprint document {}: {source}", path.display())]
  InvalidDocument {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("blueprint document {} declares {found}, expected {expected}", path.display())]
  IdentityMismatch {
    path: PathBuf,
    expected: String,
    found: String,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
