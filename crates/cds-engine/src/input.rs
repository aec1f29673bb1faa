//! Step input rendering with minijinja.
//!
//! Node template inputs are rendered against a context with three
//! namespaces:
//! ```json
//! {
//!   "inputs": { ... request payload ... },
//!   "resources": { "vnf-id": "v-1", ... },
//!   "steps": { "assign": { ... response data ... } }
//! }
//! ```
//! A string that is exactly one `{{ expr }}` keeps the type of the
//! expression, so `"{{ resources.port }}"` renders to a number.

use std::collections::HashMap;

use cds_config::InputValue;
use minijinja::{Environment, Value};

use crate::error::StepError;

/// Render a node template's inputs for `step`.
pub fn resolve_inputs(
  step: &str,
  inputs: &HashMap<String, InputValue>,
  context: &serde_json::Value,
) -> Result<serde_json::Value, StepError> {
  let env = Environment::new();
  let ctx_value = Value::from_serialize(context);

  let mut resolved = serde_json::Map::new();
  for (key, value) in inputs {
    resolved.insert(
      key.clone(),
      resolve_json_value(&env, step, key, value, &ctx_value)?,
    );
  }
  Ok(serde_json::Value::Object(resolved))
}

fn resolve_json_value(
  env: &Environment,
  step: &str,
  input_key: &str,
  value: &serde_json::Value,
  context: &Value,
) -> Result<serde_json::Value, StepError> {
  match value {
    serde_json::Value::String(s) => {
      if let Some(expr) = pure_expression(s) {
        return evaluate_expression(env, step, input_key, expr, context);
      }
      if s.contains("{{") || s.contains("{%") {
        let rendered = env
          .render_str(s, context)
          .map_err(|e| input_error(step, input_key, e))?;
        return Ok(serde_json::Value::String(rendered));
      }
      Ok(value.clone())
    }
    serde_json::Value::Array(items) => items
      .iter()
      .map(|v| resolve_json_value(env, step, input_key, v, context))
      .collect::<Result<Vec<_>, _>>()
      .map(serde_json::Value::Array),
    serde_json::Value::Object(object) => {
      let mut resolved = serde_json::Map::new();
      for (k, v) in object {
        resolved.insert(k.clone(), resolve_json_value(env, step, input_key, v, context)?);
      }
      Ok(serde_json::Value::Object(resolved))
    }
    _ => Ok(value.clone()),
  }
}

/// The expression of a string that is just `{{ expr }}`.
fn pure_expression(s: &str) -> Option<&str> {
  let trimmed = s.trim();
  let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
  if inner.contains("{{") || inner.contains("}}") {
    return None;
  }
  Some(inner.trim())
}

fn evaluate_expression(
  env: &Environment,
  step: &str,
  input_key: &str,
  expr: &str,
  context: &Value,
) -> Result<serde_json::Value, StepError> {
  let expression = env
    .compile_expression(expr)
    .map_err(|e| input_error(step, input_key, e))?;
  let value = expression
    .eval(context)
    .map_err(|e| input_error(step, input_key, e))?;
  if value.is_undefined() {
    return Ok(serde_json::Value::Null);
  }
  serde_json::to_value(&value).map_err(|e| StepError::InputResolution {
    step: step.to_string(),
    message: format!("input '{}': {}", input_key, e),
  })
}

fn input_error(step: &str, input_key: &str, error: minijinja::Error) -> StepError {
  StepError::InputResolution {
    step: step.to_string(),
    message: format!("input '{}': {}", input_key, error),
  }
}
