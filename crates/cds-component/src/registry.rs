use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::node::ComponentNode;

/// Lookup of component nodes by name.
pub trait ComponentRegistry: Send + Sync {
  fn get(&self, name: &str) -> Option<Arc<dyn ComponentNode>>;
}

/// Registry populated by the host at startup.
#[derive(Default)]
pub struct InMemoryComponentRegistry {
  nodes: RwLock<HashMap<String, Arc<dyn ComponentNode>>>,
}

impl InMemoryComponentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a node under its name, replacing any previous one.
  pub fn register<N: ComponentNode + 'static>(&self, node: N) {
    self.register_arc(Arc::new(node));
  }

  pub fn register_arc(&self, node: Arc<dyn ComponentNode>) {
    let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
    nodes.insert(node.name().to_string(), node);
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<String> {
    let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<String> = nodes.keys().cloned().collect();
    names.sort();
    names
  }
}

impl ComponentRegistry for InMemoryComponentRegistry {
  fn get(&self, name: &str) -> Option<Arc<dyn ComponentNode>> {
    let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
    nodes.get(name).cloned()
  }
}

impl std::fmt::Debug for InMemoryComponentRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("InMemoryComponentRegistry")
      .field("names", &self.names())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use serde::Deserialize;
  use serde_json::json;
  use tokio_util::sync::CancellationToken;

  use super::*;
  use crate::{ComponentError, StepAttributes, StepContext, parse_inputs};

  #[derive(Deserialize)]
  struct EchoInput {
    message: String,
  }

  struct Echo;

  #[async_trait]
  impl ComponentNode for Echo {
    fn name(&self) -> &str {
      "component-echo"
    }

    fn validate(&self, _ctx: &StepContext, inputs: &serde_json::Value) -> Result<(), ComponentError> {
      parse_inputs::<EchoInput>(inputs).map(|_| ())
    }

    async fn process(
      &self,
      _ctx: &StepContext,
      inputs: &serde_json::Value,
      _cancel: &CancellationToken,
    ) -> Result<StepAttributes, ComponentError> {
      let input: EchoInput = parse_inputs(inputs)?;
      Ok(StepAttributes::success(json!({ "echo": input.message })))
    }
  }

  #[tokio::test]
  async fn test_register_and_drive() {
    let registry = InMemoryComponentRegistry::new();
    registry.register(Echo);
    assert_eq!(registry.names(), vec!["component-echo"]);
    assert!(registry.get("component-missing").is_none());

    let node = registry.get("component-echo").unwrap();
    let ctx = StepContext::new("exec-1", "echo");
    let inputs = json!({ "message": "hi" });

    assert!(node.validate(&ctx, &json!({})).is_err());
    node.validate(&ctx, &inputs).unwrap();

    let attrs = node
      .process(&ctx, &inputs, &CancellationToken::new())
      .await
      .unwrap();
    assert!(attrs.is_success());
    assert_eq!(attrs.response_data, json!({ "echo": "hi" }));
  }

  #[tokio::test]
  async fn test_default_recover_records_error() {
    let error = ComponentError::execution("device unreachable");
    let attrs = Echo
      .recover(&error, &StepContext::default(), &json!({}))
      .await;
    assert_eq!(attrs.error_message(), Some("device unreachable"));
    assert!(!attrs.is_success());
  }
}
