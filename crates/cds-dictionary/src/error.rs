use thiserror::Error;

/// Errors that can occur when reading the resource dictionary.
#[derive(Debug, Error)]
pub enum DictionaryError {
  /// The definition name cannot be mapped to a dictionary entry.
  #[error("invalid dictionary name: {name}")]
  InvalidName { name: String },

  /// IO error when reading definition files.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Failed to parse a definition document.
  #[error("invalid definition '{name}': {source}")]
  InvalidDefinition {
    name: String,
    #[source]
    source: serde_json::Error,
  },

  /// The stored definition name doesn't match the requested one.
  #[error("definition name mismatch: requested {requested}, found {found}")]
  NameMismatch { requested: String, found: String },
}
