use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cds_engine::ExecutorConfig;
use cds_resolution::ResolverConfig;
use cds_source_rest::{RestEndpoints, RestSourceConfig};
use serde::{Deserialize, Serialize};

/// Host configuration, read from the `--config` JSON file. Every field has a
/// default so an empty object is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
  pub executor: ExecutorConfig,
  pub resolver: ResolverConfig,

  /// Retry policy shared by the REST and A&AI sources.
  pub rest: RestSourceConfig,

  /// REST systems keyed by `endpoint-selector`.
  pub rest_endpoints: RestEndpoints,

  /// SQLite database urls keyed by `endpoint-selector`.
  pub databases: HashMap<String, String>,

  /// Resource dictionary directory. Defaults to `<data-dir>/dictionary`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dictionary_dir: Option<PathBuf>,

  /// Directory `script-file` inputs and Lua capability scripts are read
  /// from. Defaults to `<data-dir>/scripts`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub script_dir: Option<PathBuf>,
}

impl EngineConfig {
  /// Read the configuration file, or the defaults when no file is given.
  pub async fn load(path: Option<&Path>) -> Result<Self> {
    let Some(path) = path else {
      return Ok(Self::default());
    };

    let content = tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse config file: {}", path.display()))
  }

  pub fn dictionary_dir(&self, data_dir: &Path) -> PathBuf {
    self
      .dictionary_dir
      .clone()
      .unwrap_or_else(|| data_dir.join("dictionary"))
  }

  pub fn script_dir(&self, data_dir: &Path) -> PathBuf {
    self
      .script_dir
      .clone()
      .unwrap_or_else(|| data_dir.join("scripts"))
  }
}
