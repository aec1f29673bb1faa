use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cds_config::ResourceDefinition;
use tokio::fs;
use tracing::debug;

use crate::dictionary::ResourceDictionary;
use crate::error::DictionaryError;
use crate::memory::InMemoryDictionary;

/// Filesystem-based resource dictionary.
///
/// Definitions are stored one per file:
/// ```text
/// {root}/
/// ├── vnf-id.json
/// ├── vnf-name.json
/// └── oam-ip-address.json
/// ```
pub struct FsResourceDictionary {
  root: PathBuf,
}

impl FsResourceDictionary {
  /// Create a new filesystem dictionary at the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the dictionary.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Map a definition name to its file, rejecting names that would escape
  /// the root directory.
  fn definition_path(&self, name: &str) -> Result<PathBuf, DictionaryError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
      return Err(DictionaryError::InvalidName {
        name: name.to_string(),
      });
    }
    Ok(self.root.join(format!("{}.json", name)))
  }

  /// Write a definition to the dictionary, replacing any existing entry.
  pub async fn install(&self, definition: &ResourceDefinition) -> Result<(), DictionaryError> {
    let path = self.definition_path(&definition.name)?;
    fs::create_dir_all(&self.root).await?;
    let content = serde_json::to_string_pretty(definition).map_err(|e| {
      DictionaryError::InvalidDefinition {
        name: definition.name.clone(),
        source: e,
      }
    })?;
    fs::write(path, content).await?;
    Ok(())
  }

  /// List the names of all stored definitions.
  pub async fn list(&self) -> Result<Vec<String>, DictionaryError> {
    let mut names = Vec::new();

    if !self.root.exists() {
      return Ok(names);
    }

    let mut entries = fs::read_dir(&self.root).await?;
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) == Some("json")
        && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
      {
        names.push(stem.to_string());
      }
    }

    names.sort();
    Ok(names)
  }

  /// Read a bundle document (a JSON object of name -> definition, as shipped in
  /// a blueprint's definitions folder) into an in-memory dictionary.
  pub async fn read_bundle(path: &Path) -> Result<InMemoryDictionary, DictionaryError> {
    let content = fs::read_to_string(path).await?;
    let bundle: HashMap<String, ResourceDefinition> =
      serde_json::from_str(&content).map_err(|e| DictionaryError::InvalidDefinition {
        name: path.display().to_string(),
        source: e,
      })?;

    Ok(InMemoryDictionary::from_definitions(bundle.into_values()))
  }
}

#[async_trait]
impl ResourceDictionary for FsResourceDictionary {
  async fn lookup(&self, name: &str) -> Result<Option<ResourceDefinition>, DictionaryError> {
    let path = self.definition_path(name)?;

    let content = match fs::read_to_string(&path).await {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(name = %name, path = %path.display(), "dictionary entry not found");
        return Ok(None);
      }
      Err(e) => return Err(e.into()),
    };

    let definition: ResourceDefinition =
      serde_json::from_str(&content).map_err(|e| DictionaryError::InvalidDefinition {
        name: name.to_string(),
        source: e,
      })?;

    if definition.name != name {
      return Err(DictionaryError::NameMismatch {
        requested: name.to_string(),
        found: definition.name,
      });
    }

    Ok(Some(definition))
  }
}
