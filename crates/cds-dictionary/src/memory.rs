use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use cds_config::ResourceDefinition;

use crate::dictionary::ResourceDictionary;
use crate::error::DictionaryError;

/// Dictionary held in memory, typically populated at startup from a
/// blueprint's definition files.
#[derive(Debug, Default)]
pub struct InMemoryDictionary {
  definitions: RwLock<HashMap<String, ResourceDefinition>>,
}

impl InMemoryDictionary {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a dictionary from definitions, keyed by their names.
  pub fn from_definitions(definitions: impl IntoIterator<Item = ResourceDefinition>) -> Self {
    let map = definitions
      .into_iter()
      .map(|d| (d.name.clone(), d))
      .collect();
    Self {
      definitions: RwLock::new(map),
    }
  }

  /// Insert or replace a definition.
  pub fn insert(&self, definition: ResourceDefinition) {
    let mut definitions = self.definitions.write().unwrap_or_else(|e| e.into_inner());
    definitions.insert(definition.name.clone(), definition);
  }

  pub fn len(&self) -> usize {
    self
      .definitions
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl ResourceDictionary for InMemoryDictionary {
  async fn lookup(&self, name: &str) -> Result<Option<ResourceDefinition>, DictionaryError> {
    let definitions = self.definitions.read().unwrap_or_else(|e| e.into_inner());
    Ok(definitions.get(name).cloned())
  }
}
