//! Blueprint catalogs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use cds_config::BlueprintDef;
use tokio::fs;
use tracing::debug;

use crate::error::CatalogError;

/// Source of deployed blueprints.
#[async_trait]
pub trait BlueprintCatalog: Send + Sync {
  async fn load(&self, name: &str, version: &str) -> Result<BlueprintDef, CatalogError>;
}

/// Filesystem catalog.
///
/// Each blueprint version is one document:
/// ```text
/// {root}/
/// └── vFW/
///     ├── 1.0.0/blueprint.json
///     └── 1.1.0/blueprint.json
/// ```
pub struct FsBlueprintCatalog {
  root: PathBuf,
}

impl FsBlueprintCatalog {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn blueprint_path(&self, name: &str, version: &str) -> Result<PathBuf, CatalogError> {
    for value in [name, version] {
      if value.is_empty() || value.contains('/') || value.contains('\\') || value.starts_with('.') {
        return Err(CatalogError::InvalidIdentifier {
          value: value.to_string(),
        });
      }
    }
    Ok(self.root.join(name).join(version).join("blueprint.json"))
  }

  /// Store a blueprint, replacing the same name and version.
  pub async fn install(&self, blueprint: &BlueprintDef) -> Result<PathBuf, CatalogError> {
    let path = self.blueprint_path(&blueprint.name, &blueprint.version)?;
    if let Some(dir) = path.parent() {
      fs::create_dir_all(dir).await?;
    }
    let content =
      serde_json::to_string_pretty(blueprint).map_err(|e| CatalogError::InvalidDocument {
        path: path.clone(),
        source: e,
      })?;
    fs::write(&path, content).await?;
    Ok(path)
  }

  /// Installed `(name, version)` pairs, sorted.
  pub async fn list(&self) -> Result<Vec<(String, String)>, CatalogError> {
    let mut blueprints = Vec::new();
    if !self.root.exists() {
      return Ok(blueprints);
    }

    let mut names = fs::read_dir(&self.root).await?;
    while let Some(name_entry) = names.next_entry().await? {
      if !name_entry.file_type().await?.is_dir() {
        continue;
      }
      let name = name_entry.file_name().to_string_lossy().to_string();
      let mut versions = fs::read_dir(name_entry.path()).await?;
      while let Some(version_entry) = versions.next_entry().await? {
        if version_entry.path().join("blueprint.json").is_file() {
          let version = version_entry.file_name().to_string_lossy().to_string();
          blueprints.push((name.clone(), version));
        }
      }
    }

    blueprints.sort();
    Ok(blueprints)
  }

  /// Parse a blueprint document from any path.
  pub async fn read_document(path: &Path) -> Result<BlueprintDef, CatalogError> {
    let content = fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| CatalogError::InvalidDocument {
      path: path.to_path_buf(),
      source: e,
    })
  }
}

#[async_trait]
impl BlueprintCatalog for FsBlueprintCatalog {
  async fn load(&self, name: &str, version: &str) -> Result<BlueprintDef, CatalogError> {
    let path = self.blueprint_path(name, version)?;
    if !path.is_file() {
      debug!(name = %name, version = %version, path = %path.display(), "blueprint_not_found");
      return Err(CatalogError::NotFound {
        name: name.to_string(),
        version: version.to_string(),
      });
    }

    let blueprint = Self::read_document(&path).await?;
    if blueprint.name != name || blueprint.version != version {
      return Err(CatalogError::IdentityMismatch {
        path,
        expected: format!("{}/{}", name, version),
        found: format!("{}/{}", blueprint.name, blueprint.version),
      });
    }
    Ok(blueprint)
  }
}

/// Catalog held in memory.
#[derive(Debug, Default)]
pub struct InMemoryBlueprintCatalog {
  blueprints: RwLock<HashMap<(String, String), BlueprintDef>>,
}

impl InMemoryBlueprintCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, blueprint: BlueprintDef) {
    let key = (blueprint.name.clone(), blueprint.version.clone());
    let mut blueprints = self.blueprints.write().unwrap_or_else(|e| e.into_inner());
    blueprints.insert(key, blueprint);
  }
}

#[async_trait]
impl BlueprintCatalog for InMemoryBlueprintCatalog {
  async fn load(&self, name: &str, version: &str) -> Result<BlueprintDef, CatalogError> {
    let blueprints = self.blueprints.read().unwrap_or_else(|e| e.into_inner());
    blueprints
      .get(&(name.to_string(), version.to_string()))
      .cloned()
      .ok_or_else(|| CatalogError::NotFound {
        name: name.to_string(),
        version: version.to_string(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn blueprint(name: &str, version: &str) -> BlueprintDef {
    BlueprintDef {
      name: name.to_string(),
      version: version.to_string(),
      description: String::new(),
      workflows: HashMap::new(),
      node_templates: HashMap::new(),
    }
  }

  #[tokio::test]
  async fn test_install_list_load() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FsBlueprintCatalog::new(dir.path());

    catalog.install(&blueprint("vFW", "1.0.0")).await.unwrap();
    catalog.install(&blueprint("vFW", "1.1.0")).await.unwrap();
    catalog.install(&blueprint("vDNS", "2.0.0")).await.unwrap();

    assert_eq!(
      catalog.list().await.unwrap(),
      vec![
        ("vDNS".to_string(), "2.0.0".to_string()),
        ("vFW".to_string(), "1.0.0".to_string()),
        ("vFW".to_string(), "1.1.0".to_string()),
      ]
    );

    let loaded = catalog.load("vFW", "1.1.0").await.unwrap();
    assert_eq!(loaded, blueprint("vFW", "1.1.0"));
    assert!(matches!(
      catalog.load("vFW", "9.9.9").await,
      Err(CatalogError::NotFound { .. })
    ));
  }

  #[tokio::test]
  async fn test_rejects_traversal_and_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FsBlueprintCatalog::new(dir.path());
    assert!(matches!(
      catalog.load("../etc", "1.0.0").await,
      Err(CatalogError::InvalidIdentifier { .. })
    ));

    let path = dir.path().join("vFW").join("1.0.0");
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(
      path.join("blueprint.json"),
      serde_json::to_string(&blueprint("vFW", "2.0.0")).unwrap(),
    )
    .unwrap();
    assert!(matches!(
      catalog.load("vFW", "1.0.0").await,
      Err(CatalogError::IdentityMismatch { .. })
    ));
  }

  #[tokio::test]
  async fn test_in_memory() {
    let catalog = InMemoryBlueprintCatalog::new();
    catalog.insert(blueprint("vFW", "1.0.0"));
    assert!(catalog.load("vFW", "1.0.0").await.is_ok());
    assert!(catalog.load("vFW", "2.0.0").await.is_err());
  }
}
