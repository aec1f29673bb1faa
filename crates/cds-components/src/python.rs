use async_trait::async_trait;
use cds_component::{ComponentError, ComponentNode, StepAttributes, StepContext, parse_inputs};
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::process::{run_child, stream_text};

pub const PYTHON_COMPONENT: &str = "component-python";

const DEFAULT_INTERPRETER: &str = "python3";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PythonInput {
  script_file: String,
  #[serde(default)]
  python_interpreter: Option<String>,
  #[serde(default)]
  args: Vec<String>,
}

/// Runs a Python script with `{inputs, context}` as JSON on stdin. Whatever
/// the script prints is the response data, parsed as JSON when possible.
#[derive(Debug, Clone, Default)]
pub struct PythonComponent;

impl PythonComponent {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl ComponentNode for PythonComponent {
  fn name(&self) -> &str {
    PYTHON_COMPONENT
  }

  fn validate(&self, _ctx: &StepContext, inputs: &serde_json::Value) -> Result<(), ComponentError> {
    let input: PythonInput = parse_inputs(inputs)?;
    if input.script_file.trim().is_empty() {
      return Err(ComponentError::invalid_input("script-file", "must not be empty"));
    }
    Ok(())
  }

  async fn process(
    &self,
    ctx: &StepContext,
    inputs: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError> {
    let input: PythonInput = parse_inputs(inputs)?;
    let interpreter = input
      .python_interpreter
      .as_deref()
      .unwrap_or(DEFAULT_INTERPRETER);

    let mut command = Command::new(interpreter);
    command.arg(&input.script_file).args(&input.args);

    let stdin = serde_json::to_vec(&json!({ "inputs": inputs, "context": ctx.to_json() }))
      .map_err(|e| ComponentError::execution(format!("failed to encode script input: {}", e)))?;

    debug!(
      step = %ctx.step_name,
      interpreter,
      script = %input.script_file,
      "python_script_started"
    );
    let output = run_child(command, Some(stdin), cancel).await?;

    let stdout = stream_text(&output.stdout);
    let response = serde_json::from_str(&stdout).unwrap_or(serde_json::Value::String(stdout));

    if !output.status.success() {
      let exit_code = output.status.code().unwrap_or(-1);
      return Ok(
        StepAttributes::failure(response)
          .with_attribute(
            "error",
            format!("script '{}' exited with code {}", input.script_file, exit_code),
          )
          .with_attribute("stderr", stream_text(&output.stderr)),
      );
    }

    Ok(StepAttributes::success(response))
  }
}
