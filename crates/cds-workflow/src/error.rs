use thiserror::Error;

/// Errors raised while building a workflow graph. All of them are build-time
/// errors: a workflow that fails here is never executed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
  #[error("workflow has no steps")]
  EmptyWorkflow,

  #[error("duplicate step name: {step}")]
  DuplicateStep { step: String },

  #[error("step '{referenced_by}' references unknown step '{step}'")]
  MissingStep { step: String, referenced_by: String },

  #[error("step '{step}' lists itself as a next step")]
  SelfTransition { step: String },

  #[error("no entry step found (every step has incoming transitions and none is marked start)")]
  NoEntryPoint,

  #[error("ambiguous entry step, candidates: {}", candidates.join(", "))]
  AmbiguousEntryPoint { candidates: Vec<String> },

  #[error("more than one step is marked start: {}", steps.join(", "))]
  MultipleStartSteps { steps: Vec<String> },
}
