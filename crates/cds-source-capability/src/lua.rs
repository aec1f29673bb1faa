use mlua::{HookTriggers, Lua, LuaSerdeExt, VmState};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Instructions between cancellation checks inside the interpreter.
const HOOK_INSTRUCTIONS: u32 = 1000;

/// Run a capability chunk. `globals` is an object whose entries become Lua
/// globals; the chunk's return value is the result.
pub(crate) fn run_capability(
  source: &str,
  chunk_name: &str,
  globals: &Value,
  cancel: CancellationToken,
) -> mlua::Result<Value> {
  let lua = Lua::new();
  lua.set_hook(
    HookTriggers::new().every_nth_instruction(HOOK_INSTRUCTIONS),
    move |_lua, _debug| {
      if cancel.is_cancelled() {
        Err(mlua::Error::runtime("capability cancelled"))
      } else {
        Ok(VmState::Continue)
      }
    },
  );

  let table = lua.globals();
  if let Some(entries) = globals.as_object() {
    for (name, value) in entries {
      table.set(name.as_str(), lua.to_value(value)?)?;
    }
  }
  let log = lua.create_function(|_, message: String| {
    info!(message = %message, "capability_log");
    Ok(())
  })?;
  table.set("log", log)?;

  let result: mlua::Value = lua.load(source).set_name(chunk_name).eval()?;
  lua.from_value(result)
}
