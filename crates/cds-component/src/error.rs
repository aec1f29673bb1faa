use thiserror::Error;

/// Errors raised by a component node.
#[derive(Debug, Error)]
pub enum ComponentError {
  /// An input is missing or malformed.
  #[error("invalid input '{field}': {message}")]
  InvalidInput { field: String, message: String },

  /// The component ran but its work failed.
  #[error("{message}")]
  Execution { message: String },

  #[error("component cancelled")]
  Cancelled,

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ComponentError {
  pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
    ComponentError::InvalidInput {
      field: field.into(),
      message: message.into(),
    }
  }

  pub fn execution(message: impl Into<String>) -> Self {
    ComponentError::Execution {
      message: message.into(),
    }
  }
}
