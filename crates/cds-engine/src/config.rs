use serde::{Deserialize, Serialize};

/// Limits applied to every execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExecutorConfig {
  /// Step invocations allowed per execution. The invocation that would
  /// exceed it is refused before it starts.
  pub max_step_invocations: usize,

  /// Invocations allowed per step name, unbounded when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_step_visits: Option<usize>,

  /// Bound on a component's `process` call, unless the node template sets
  /// its own.
  pub step_timeout_ms: u64,
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      max_step_invocations: 1000,
      max_step_visits: None,
      step_timeout_ms: 300_000,
    }
  }
}
