use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use cds_component::{ComponentError, ComponentNode, StepAttributes, StepContext, parse_inputs};
use mlua::{HookTriggers, Lua, LuaSerdeExt, VmState};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const SCRIPT_COMPONENT: &str = "component-script";

/// Instructions between cancellation checks inside the interpreter.
const HOOK_INSTRUCTIONS: u32 = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ScriptInput {
  #[serde(default)]
  script: Option<String>,
  #[serde(default)]
  script_file: Option<String>,
}

/// Runs a Lua script with `inputs` and `context` globals. The value the
/// script returns is the response data; a Lua error fails the step.
#[derive(Debug, Default)]
pub struct ScriptComponent {
  script_dir: Option<PathBuf>,
  cache: ScriptCache,
}

impl ScriptComponent {
  pub fn new() -> Self {
    Self::default()
  }

  /// Resolve relative `script-file` paths against `dir`.
  pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.script_dir = Some(dir.into());
    self
  }

  async fn source(&self, input: &ScriptInput) -> Result<(Arc<str>, String), ComponentError> {
    if let Some(script) = &input.script {
      return Ok((Arc::from(script.as_str()), "inline".to_string()));
    }
    let Some(file) = &input.script_file else {
      return Err(ComponentError::invalid_input(
        "script",
        "either 'script' or 'script-file' is required",
      ));
    };
    let path = match &self.script_dir {
      Some(dir) if Path::new(file).is_relative() => dir.join(file),
      _ => PathBuf::from(file),
    };
    let source = self.cache.get_or_load(&path).await?;
    Ok((source, file.clone()))
  }
}

#[async_trait]
impl ComponentNode for ScriptComponent {
  fn name(&self) -> &str {
    SCRIPT_COMPONENT
  }

  fn validate(&self, _ctx: &StepContext, inputs: &serde_json::Value) -> Result<(), ComponentError> {
    let input: ScriptInput = parse_inputs(inputs)?;
    if input.script.is_none() && input.script_file.is_none() {
      return Err(ComponentError::invalid_input(
        "script",
        "either 'script' or 'script-file' is required",
      ));
    }
    Ok(())
  }

  async fn process(
    &self,
    ctx: &StepContext,
    inputs: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError> {
    let input: ScriptInput = parse_inputs(inputs)?;
    let (source, chunk_name) = self.source(&input).await?;

    debug!(step = %ctx.step_name, chunk = %chunk_name, "script_started");

    let inputs = inputs.clone();
    let context = ctx.to_json();
    let hook_cancel = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
      run_script(&source, &chunk_name, &inputs, &context, hook_cancel).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| ComponentError::execution(format!("script task failed: {}", e)))?;

    if cancel.is_cancelled() {
      return Err(ComponentError::Cancelled);
    }

    let response = result.map_err(ComponentError::execution)?;
    Ok(StepAttributes::success(response))
  }
}

fn run_script(
  source: &str,
  chunk_name: &str,
  inputs: &serde_json::Value,
  context: &serde_json::Value,
  cancel: CancellationToken,
) -> mlua::Result<serde_json::Value> {
  let lua = Lua::new();
  lua.set_hook(
    HookTriggers::new().every_nth_instruction(HOOK_INSTRUCTIONS),
    move |_lua, _debug| {
      if cancel.is_cancelled() {
        Err(mlua::Error::runtime("script cancelled"))
      } else {
        Ok(VmState::Continue)
      }
    },
  );

  let globals = lua.globals();
  globals.set("inputs", lua.to_value(inputs)?)?;
  globals.set("context", lua.to_value(context)?)?;
  let log = lua.create_function(|_, message: String| {
    info!(message = %message, "script_log");
    Ok(())
  })?;
  globals.set("log", log)?;

  let result: mlua::Value = lua.load(source).set_name(chunk_name).eval()?;
  lua.from_value(result)
}

/// Script sources keyed by path, loaded once.
#[derive(Debug, Default)]
struct ScriptCache {
  sources: RwLock<HashMap<PathBuf, Arc<str>>>,
}

impl ScriptCache {
  async fn get_or_load(&self, path: &Path) -> Result<Arc<str>, ComponentError> {
    {
      let sources = self.sources.read().unwrap_or_else(|e| e.into_inner());
      if let Some(source) = sources.get(path) {
        return Ok(source.clone());
      }
    }

    let source: Arc<str> = tokio::fs::read_to_string(path)
      .await
      .map_err(|e| {
        ComponentError::invalid_input("script-file", format!("{}: {}", path.display(), e))
      })?
      .into();

    let mut sources = self.sources.write().unwrap_or_else(|e| e.into_inner());
    sources.insert(path.to_path_buf(), source.clone());
    Ok(source)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  async fn run(component: &ScriptComponent, inputs: serde_json::Value) -> Result<StepAttributes, ComponentError> {
    let ctx = StepContext::new("exec-1", "lua");
    component
      .process(&ctx, &inputs, &CancellationToken::new())
      .await
  }

  #[tokio::test]
  async fn test_inline_script_returns_response() {
    let attrs = run(
      &ScriptComponent::new(),
      json!({
        "script": "return { greeting = 'hello ' .. inputs.name, step = context['step-name'], count = #inputs.items }",
        "name": "bob",
        "items": [1, 2, 3]
      }),
    )
    .await
    .unwrap();

    assert!(attrs.is_success());
    assert_eq!(
      attrs.response_data,
      json!({ "greeting": "hello bob", "step": "lua", "count": 3 })
    );
  }

  #[tokio::test]
  async fn test_lua_error_fails() {
    let result = run(&ScriptComponent::new(), json!({ "script": "error('device rejected')" })).await;
    match result {
      Err(ComponentError::Execution { message }) => assert!(message.contains("device rejected")),
      other => panic!("expected execution error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_script_file_is_cached() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("step.lua"), "return inputs.value * 2").unwrap();
    let component = ScriptComponent::new().with_script_dir(dir.path());

    let attrs = run(&component, json!({ "script-file": "step.lua", "value": 21 }))
      .await
      .unwrap();
    assert_eq!(attrs.response_data, json!(42));

    // Served from the cache once loaded.
    std::fs::remove_file(dir.path().join("step.lua")).unwrap();
    let attrs = run(&component, json!({ "script-file": "step.lua", "value": 5 }))
      .await
      .unwrap();
    assert_eq!(attrs.response_data, json!(10));
  }

  #[tokio::test]
  async fn test_cancelled_script_stops() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = ScriptComponent::new()
      .process(
        &StepContext::default(),
        &json!({ "script": "while true do end" }),
        &cancel,
      )
      .await;
    assert!(matches!(result, Err(ComponentError::Cancelled)));
  }

  #[test]
  fn test_validate_requires_source() {
    let ctx = StepContext::default();
    assert!(ScriptComponent::new().validate(&ctx, &json!({})).is_err());
    ScriptComponent::new()
      .validate(&ctx, &json!({ "script": "return 1" }))
      .unwrap();
  }
}
