use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use cds_resolution::{SourceError, SourceRequest, SourceValue};
use serde_json::{Map, Value};

/// Native resolution logic addressed by `script-class-reference`.
#[async_trait]
pub trait ResolutionCapability: Send + Sync {
  fn name(&self) -> &str;

  /// Produce the value of `request.assignment` from the resolved values of
  /// its dependencies.
  async fn resolve(
    &self,
    request: &SourceRequest<'_>,
    dependencies: &Map<String, Value>,
  ) -> Result<SourceValue, SourceError>;
}

/// Native capabilities keyed by name.
#[derive(Default)]
pub struct CapabilityRegistry {
  capabilities: RwLock<HashMap<String, Arc<dyn ResolutionCapability>>>,
}

impl CapabilityRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register<C: ResolutionCapability + 'static>(&self, capability: C) {
    let capability: Arc<dyn ResolutionCapability> = Arc::new(capability);
    let mut capabilities = self.capabilities.write().unwrap_or_else(|e| e.into_inner());
    capabilities.insert(capability.name().to_string(), capability);
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn ResolutionCapability>> {
    let capabilities = self.capabilities.read().unwrap_or_else(|e| e.into_inner());
    capabilities.get(name).cloned()
  }

  /// Registered capability names, sorted.
  pub fn names(&self) -> Vec<String> {
    let capabilities = self.capabilities.read().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<String> = capabilities.keys().cloned().collect();
    names.sort();
    names
  }
}

impl std::fmt::Debug for CapabilityRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CapabilityRegistry")
      .field("capabilities", &self.names())
      .finish()
  }
}
