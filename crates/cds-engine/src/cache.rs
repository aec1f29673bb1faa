//! Workflow graph caching.
//!
//! Graphs are built once per blueprint version and action and shared by
//! every execution of that action.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use cds_config::WorkflowDef;
use cds_workflow::{WorkflowError, WorkflowGraph};

/// Cache key for built workflow graphs.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct GraphKey {
  pub blueprint_name: String,
  pub blueprint_version: String,
  pub action_name: String,
}

impl GraphKey {
  pub fn new(
    blueprint_name: impl Into<String>,
    blueprint_version: impl Into<String>,
    action_name: impl Into<String>,
  ) -> Self {
    Self {
      blueprint_name: blueprint_name.into(),
      blueprint_version: blueprint_version.into(),
      action_name: action_name.into(),
    }
  }
}

#[derive(Debug, Default)]
pub struct GraphCache {
  cache: RwLock<HashMap<GraphKey, Arc<WorkflowGraph>>>,
}

impl GraphCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Get a built graph from cache, or build and cache it. Invalid workflows
  /// are not cached.
  pub fn get_or_build(
    &self,
    key: &GraphKey,
    workflow: &WorkflowDef,
  ) -> Result<Arc<WorkflowGraph>, WorkflowError> {
    {
      let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
      if let Some(graph) = cache.get(key) {
        return Ok(graph.clone());
      }
    }

    let graph = Arc::new(WorkflowGraph::from_workflow(workflow)?);

    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    Ok(cache.entry(key.clone()).or_insert(graph).clone())
  }

  /// Drop every cached graph of a blueprint version.
  pub fn invalidate(&self, blueprint_name: &str, blueprint_version: &str) {
    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    cache.retain(|key, _| {
      key.blueprint_name != blueprint_name || key.blueprint_version != blueprint_version
    });
  }

  pub fn clear(&self) {
    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    cache.clear();
  }

  pub fn len(&self) -> usize {
    self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
