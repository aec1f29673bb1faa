use std::collections::HashMap;

use async_trait::async_trait;
use cds_component::{ComponentError, ComponentNode, StepAttributes, StepContext, parse_inputs};
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::process::{run_child, stream_text};

pub const CLI_COMPONENT: &str = "component-cli";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CliInput {
  commands: Vec<String>,
  #[serde(default)]
  working_dir: Option<String>,
  #[serde(default)]
  ignore_errors: bool,
  #[serde(default)]
  env: HashMap<String, String>,
}

/// Runs shell commands in order.
#[derive(Debug, Clone)]
pub struct CliComponent {
  shell: String,
}

impl CliComponent {
  pub fn new() -> Self {
    Self {
      shell: "sh".to_string(),
    }
  }

  pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
    self.shell = shell.into();
    self
  }
}

impl Default for CliComponent {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl ComponentNode for CliComponent {
  fn name(&self) -> &str {
    CLI_COMPONENT
  }

  fn validate(&self, _ctx: &StepContext, inputs: &serde_json::Value) -> Result<(), ComponentError> {
    let input: CliInput = parse_inputs(inputs)?;
    if input.commands.is_empty() {
      return Err(ComponentError::invalid_input("commands", "at least one command is required"));
    }
    Ok(())
  }

  async fn process(
    &self,
    ctx: &StepContext,
    inputs: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError> {
    let input: CliInput = parse_inputs(inputs)?;
    let mut results = Vec::with_capacity(input.commands.len());

    for command_line in &input.commands {
      let mut command = Command::new(&self.shell);
      command.arg("-c").arg(command_line).envs(&input.env);
      if let Some(dir) = &input.working_dir {
        command.current_dir(dir);
      }

      debug!(step = %ctx.step_name, command = %command_line, "cli_command_started");
      let output = run_child(command, None, cancel).await?;
      let exit_code = output.status.code().unwrap_or(-1);

      results.push(json!({
        "command": command_line,
        "exit-code": exit_code,
        "stdout": stream_text(&output.stdout),
        "stderr": stream_text(&output.stderr),
      }));

      if !output.status.success() {
        if input.ignore_errors {
          warn!(step = %ctx.step_name, command = %command_line, exit_code, "cli_command_failed_ignored");
          continue;
        }
        return Ok(
          StepAttributes::failure(serde_json::Value::Array(results)).with_attribute(
            "error",
            format!("command '{}' exited with code {}", command_line, exit_code),
          ),
        );
      }
    }

    Ok(StepAttributes::success(serde_json::Value::Array(results)))
  }
}
