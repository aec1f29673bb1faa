use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::attributes::StepAttributes;
use crate::context::StepContext;
use crate::error::ComponentError;

/// A component function driven by a workflow step.
#[async_trait]
pub trait ComponentNode: Send + Sync {
  /// Registry key, e.g. "component-script".
  fn name(&self) -> &str;

  /// Check the rendered inputs before processing. Must be side-effect free.
  fn validate(&self, _ctx: &StepContext, _inputs: &serde_json::Value) -> Result<(), ComponentError> {
    Ok(())
  }

  /// Do the work of the step. Implementations stop early once `cancel` fires.
  async fn process(
    &self,
    ctx: &StepContext,
    inputs: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError>;

  /// Called after a failed step. Never fails; the returned attributes are
  /// appended to the step record.
  async fn recover(
    &self,
    error: &(dyn std::error::Error + Send + Sync),
    _ctx: &StepContext,
    _inputs: &serde_json::Value,
  ) -> StepAttributes {
    StepAttributes::failure(serde_json::Value::Null).with_attribute("error", error.to_string())
  }
}

/// Deserialize the rendered inputs into a component's input type.
pub fn parse_inputs<T: DeserializeOwned>(inputs: &serde_json::Value) -> Result<T, ComponentError> {
  serde_json::from_value(inputs.clone())
    .map_err(|e| ComponentError::invalid_input("inputs", e.to_string()))
}
