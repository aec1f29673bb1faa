use cds_dictionary::DictionaryError;
use thiserror::Error;

/// Fatal errors that abort a whole resolution request.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The dependency relation between assignments contains a cycle.
  #[error("cyclic dependency between assignments: {}", remaining.join(", "))]
  CyclicDependency { remaining: Vec<String> },

  /// An assignment declares a dependency on an assignment that is not part of
  /// the request.
  #[error("assignment '{assignment}' depends on unknown assignment '{dependency}'")]
  UnknownDependency {
    assignment: String,
    dependency: String,
  },

  #[error("duplicate assignment name: {name}")]
  DuplicateAssignment { name: String },

  #[error("dictionary lookup failed: {0}")]
  Dictionary(#[from] DictionaryError),

  #[error("resolution cancelled")]
  Cancelled,
}

/// Hard failure of a single source call. A soft miss is not an error, see
/// [`SourceValue::NotFound`](crate::SourceValue::NotFound).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  #[error("invalid source configuration: {message}")]
  InvalidConfig { message: String },

  #[error("source request failed: {message}")]
  Request { message: String },

  #[error("source call timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  #[error("value cannot be coerced to '{expected}': {message}")]
  Coercion { expected: String, message: String },
}

impl SourceError {
  pub fn invalid_config(message: impl Into<String>) -> Self {
    SourceError::InvalidConfig {
      message: message.into(),
    }
  }

  pub fn request(message: impl Into<String>) -> Self {
    SourceError::Request {
      message: message.into(),
    }
  }
}

/// Why a single assignment did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentFailure {
  #[error("no source produced a value for '{name}' (tried: {})", tried.join(", "))]
  Unresolved { name: String, tried: Vec<String> },

  #[error("'{name}' not resolved because dependency '{dependency}' failed")]
  DependencyFailed { name: String, dependency: String },

  #[error("source '{source_name}' failed for '{name}': {error}")]
  SourceFailed {
    name: String,
    source_name: String,
    #[source]
    error: SourceError,
  },

  #[error("dictionary definition '{dictionary_name}' does not declare source '{source_name}' used by '{name}'")]
  MissingDefinition {
    name: String,
    dictionary_name: String,
    source_name: String,
  },

  #[error("no evaluator registered for source type '{source_type}' used by '{name}'")]
  NoEvaluator { name: String, source_type: String },
}

impl AssignmentFailure {
  /// Name of the assignment that failed.
  pub fn assignment(&self) -> &str {
    match self {
      AssignmentFailure::Unresolved { name, .. }
      | AssignmentFailure::DependencyFailed { name, .. }
      | AssignmentFailure::SourceFailed { name, .. }
      | AssignmentFailure::MissingDefinition { name, .. }
      | AssignmentFailure::NoEvaluator { name, .. } => name,
    }
  }
}
