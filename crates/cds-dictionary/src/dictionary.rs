use std::collections::HashMap;

use async_trait::async_trait;
use cds_config::ResourceDefinition;

use crate::error::DictionaryError;

/// Result of a bulk lookup. Missing names are reported rather than failing
/// the whole lookup.
#[derive(Debug, Clone, Default)]
pub struct DictionaryLookup {
  pub found: HashMap<String, ResourceDefinition>,
  pub missing: Vec<String>,
}

/// Read-only keyed store of resource definitions.
#[async_trait]
pub trait ResourceDictionary: Send + Sync {
  /// Look up a single definition by name.
  async fn lookup(&self, name: &str) -> Result<Option<ResourceDefinition>, DictionaryError>;

  /// Look up many definitions. Duplicate names are looked up once.
  async fn lookup_many(&self, names: &[String]) -> Result<DictionaryLookup, DictionaryError> {
    let mut result = DictionaryLookup::default();

    for name in names {
      if result.found.contains_key(name) || result.missing.contains(name) {
        continue;
      }
      match self.lookup(name).await? {
        Some(definition) => {
          result.found.insert(name.clone(), definition);
        }
        None => result.missing.push(name.clone()),
      }
    }

    Ok(result)
  }
}
