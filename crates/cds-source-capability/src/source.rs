use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cds_resolution::{SourceError, SourceEvaluator, SourceRequest, SourceValue};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::capability::{CapabilityRegistry, ResolutionCapability};
use crate::lua::run_capability;

pub const CAPABILITY_SOURCE_TYPE: &str = "source-capability";

const INTERNAL_SCRIPT_TYPE: &str = "internal";
const LUA_SCRIPT_TYPE: &str = "lua";

/// Resolves values through native or Lua capabilities.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySourceEvaluator {
  capabilities: Arc<CapabilityRegistry>,
  script_dir: Option<PathBuf>,
}

impl CapabilitySourceEvaluator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Resolve relative `script-file` paths against `dir`.
  pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.script_dir = Some(dir.into());
    self
  }

  pub fn with_capability<C: ResolutionCapability + 'static>(self, capability: C) -> Self {
    self.capabilities.register(capability);
    self
  }

  pub fn capabilities(&self) -> &CapabilityRegistry {
    &self.capabilities
  }

  async fn script_source(&self, request: &SourceRequest<'_>) -> Result<(String, String), SourceError> {
    if let Some(script) = request.property_str("script") {
      return Ok((script.to_string(), "inline".to_string()));
    }
    let file = request
      .property_str("script-file")
      .or_else(|| request.property_str("script-class-reference"))
      .ok_or_else(|| {
        SourceError::invalid_config("lua capability requires 'script' or 'script-file'")
      })?;
    let path = match &self.script_dir {
      Some(dir) if Path::new(file).is_relative() => dir.join(file),
      _ => PathBuf::from(file),
    };
    let source = tokio::fs::read_to_string(&path).await.map_err(|e| {
      SourceError::invalid_config(format!("failed to read capability script {}: {}", path.display(), e))
    })?;
    Ok((source, file.to_string()))
  }

  async fn run_lua(
    &self,
    request: &SourceRequest<'_>,
    dependencies: Map<String, Value>,
  ) -> Result<SourceValue, SourceError> {
    let (source, chunk_name) = self.script_source(request).await?;
    let globals = json!({
      "dependencies": dependencies,
      "assignment": request.assignment.name,
      "properties": request.properties(),
      "context": {
        "request-id": request.context.request_id,
        "blueprint-name": request.context.blueprint_name,
        "blueprint-version": request.context.blueprint_version,
        "payload": request.context.payload,
      },
    });

    // Stops the interpreter when the resolver abandons this call.
    let cancel = CancellationToken::new();
    let _abandoned = cancel.clone().drop_guard();

    let value = tokio::task::spawn_blocking(move || {
      run_capability(&source, &chunk_name, &globals, cancel).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| SourceError::request(format!("capability task failed: {}", e)))?
    .map_err(|e| SourceError::request(format!("capability script failed: {}", e)))?;

    Ok(match value {
      Value::Null => SourceValue::NotFound,
      value => SourceValue::Resolved(value),
    })
  }
}

#[async_trait]
impl SourceEvaluator for CapabilitySourceEvaluator {
  fn source_type(&self) -> &str {
    CAPABILITY_SOURCE_TYPE
  }

  async fn evaluate(&self, request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
    let dependencies = dependency_values(&request);
    let script_type = request
      .property_str("script-type")
      .unwrap_or(INTERNAL_SCRIPT_TYPE);

    debug!(
      assignment = %request.assignment.name,
      script_type = %script_type,
      dependencies = dependencies.len(),
      "capability_source_started"
    );

    match script_type {
      INTERNAL_SCRIPT_TYPE => {
        let name = request.property_str("script-class-reference").ok_or_else(|| {
          SourceError::invalid_config("internal capability requires 'script-class-reference'")
        })?;
        let capability = self.capabilities.get(name).ok_or_else(|| {
          SourceError::invalid_config(format!("unknown capability: {}", name))
        })?;
        capability.resolve(&request, &dependencies).await
      }
      LUA_SCRIPT_TYPE => self.run_lua(&request, dependencies).await,
      other => Err(SourceError::invalid_config(format!(
        "unsupported capability script type: {}",
        other
      ))),
    }
  }
}

/// Resolved values of the assignment's dependencies and of the source's
/// `key-dependencies`, keyed by assignment name.
fn dependency_values(request: &SourceRequest<'_>) -> Map<String, Value> {
  let key_dependencies = request
    .source
    .map(|source| source.key_dependencies())
    .unwrap_or_default();

  request
    .assignment
    .dependencies
    .iter()
    .chain(key_dependencies.iter())
    .filter_map(|name| {
      request
        .resolved
        .get(name)
        .map(|value| (name.clone(), value.clone()))
    })
    .collect()
}
