use std::collections::HashMap;

use cds_config::StepRecord;
use serde_json::json;
use tracing::trace;

use crate::config::ExecutorConfig;
use crate::error::ExecutionError;

/// Phases of one step invocation.
///
/// ```text
/// Pending → Validating → Processing → Success
///              │             │
///              └─────────────┴──────→ Failure → Recovering
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
  Pending,
  Validating,
  Processing,
  Success,
  Failure,
  Recovering,
}

impl StepPhase {
  pub fn can_advance_to(self, next: StepPhase) -> bool {
    matches!(
      (self, next),
      (StepPhase::Pending, StepPhase::Validating)
        | (StepPhase::Validating, StepPhase::Processing)
        | (StepPhase::Validating, StepPhase::Failure)
        | (StepPhase::Processing, StepPhase::Success)
        | (StepPhase::Processing, StepPhase::Failure)
        | (StepPhase::Failure, StepPhase::Recovering)
    )
  }
}

/// Phase tracker of one step invocation.
#[derive(Debug)]
pub(crate) struct StepRun<'a> {
  step: &'a str,
  phase: StepPhase,
}

impl<'a> StepRun<'a> {
  pub(crate) fn new(step: &'a str) -> Self {
    Self {
      step,
      phase: StepPhase::Pending,
    }
  }

  pub(crate) fn advance(&mut self, next: StepPhase) {
    debug_assert!(
      self.phase.can_advance_to(next),
      "invalid step transition {:?} -> {:?}",
      self.phase,
      next
    );
    trace!(step = %self.step, from = ?self.phase, to = ?next, "step_phase");
    self.phase = next;
  }

  pub(crate) fn phase(&self) -> StepPhase {
    self.phase
  }
}

/// Mutable state of one execution.
#[derive(Debug)]
pub(crate) struct ExecutionState {
  pub(crate) execution_id: String,
  payload: serde_json::Value,
  invocations: usize,
  visits: HashMap<String, usize>,
  pub(crate) records: Vec<StepRecord>,
  pub(crate) step_outputs: serde_json::Map<String, serde_json::Value>,
  pub(crate) resources: serde_json::Map<String, serde_json::Value>,
  pub(crate) errors: Vec<String>,
}

impl ExecutionState {
  pub(crate) fn new(execution_id: String, payload: serde_json::Value) -> Self {
    Self {
      execution_id,
      payload,
      invocations: 0,
      visits: HashMap::new(),
      records: Vec::new(),
      step_outputs: serde_json::Map::new(),
      resources: serde_json::Map::new(),
      errors: Vec::new(),
    }
  }

  pub(crate) fn payload(&self) -> &serde_json::Value {
    &self.payload
  }

  /// Count a new invocation of `step`, refusing it when a limit is reached.
  /// Returns the 1-based invocation number.
  pub(crate) fn begin_invocation(
    &mut self,
    step: &str,
    config: &ExecutorConfig,
  ) -> Result<usize, ExecutionError> {
    if self.invocations >= config.max_step_invocations {
      return Err(ExecutionError::LimitExceeded {
        limit: config.max_step_invocations,
        step: step.to_string(),
      });
    }

    let visits = self.visits.get(step).copied().unwrap_or(0);
    if let Some(limit) = config.max_step_visits
      && visits >= limit
    {
      return Err(ExecutionError::StepVisitLimitExceeded {
        step: step.to_string(),
        limit,
      });
    }

    self.invocations += 1;
    self.visits.insert(step.to_string(), visits + 1);
    Ok(self.invocations)
  }

  pub(crate) fn invocations(&self) -> usize {
    self.invocations
  }

  /// Context that node template inputs are rendered against.
  pub(crate) fn template_context(&self) -> serde_json::Value {
    json!({
      "inputs": self.payload,
      "resources": self.resources,
      "steps": self.step_outputs,
    })
  }

  pub(crate) fn merge_resources(&mut self, values: &HashMap<String, serde_json::Value>) {
    for (name, value) in values {
      self.resources.insert(name.clone(), value.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_phase_transitions() {
    assert!(StepPhase::Pending.can_advance_to(StepPhase::Validating));
    assert!(StepPhase::Validating.can_advance_to(StepPhase::Failure));
    assert!(StepPhase::Failure.can_advance_to(StepPhase::Recovering));
    assert!(!StepPhase::Success.can_advance_to(StepPhase::Recovering));
    assert!(!StepPhase::Pending.can_advance_to(StepPhase::Processing));
  }

  #[test]
  fn test_invocation_limit() {
    let config = ExecutorConfig {
      max_step_invocations: 2,
      ..ExecutorConfig::default()
    };
    let mut state = ExecutionState::new("exec-1".to_string(), json!({}));
    assert_eq!(state.begin_invocation("a", &config).unwrap(), 1);
    assert_eq!(state.begin_invocation("a", &config).unwrap(), 2);
    assert!(matches!(
      state.begin_invocation("b", &config),
      Err(ExecutionError::LimitExceeded { limit: 2, .. })
    ));
    assert_eq!(state.invocations(), 2);
  }

  #[test]
  fn test_visit_limit() {
    let config = ExecutorConfig {
      max_step_visits: Some(1),
      ..ExecutorConfig::default()
    };
    let mut state = ExecutionState::new("exec-1".to_string(), json!({}));
    state.begin_invocation("a", &config).unwrap();
    state.begin_invocation("b", &config).unwrap();
    assert!(matches!(
      state.begin_invocation("a", &config),
      Err(ExecutionError::StepVisitLimitExceeded { .. })
    ));
  }
}
