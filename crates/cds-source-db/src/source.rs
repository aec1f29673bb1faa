use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cds_resolution::mapping::{extract_output, input_key_values, output_key_mapping};
use cds_resolution::{SourceError, SourceEvaluator, SourceRequest, SourceValue};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{debug, info};

use crate::query::{NamedQuery, row_to_json};

pub const DB_SOURCE_TYPE: &str = "source-db";

/// Pool used when a source does not name an `endpoint-selector`.
pub const DEFAULT_DB_SELECTOR: &str = "processor-db";

/// Resolves values with SQL queries against named SQLite pools.
#[derive(Debug, Clone, Default)]
pub struct DbSourceEvaluator {
  pools: Arc<HashMap<String, SqlitePool>>,
}

impl DbSourceEvaluator {
  pub fn new(pools: HashMap<String, SqlitePool>) -> Self {
    Self {
      pools: Arc::new(pools),
    }
  }

  /// A evaluator with a single pool under the default selector.
  pub fn with_default_pool(pool: SqlitePool) -> Self {
    let mut pools = HashMap::new();
    pools.insert(DEFAULT_DB_SELECTOR.to_string(), pool);
    Self::new(pools)
  }

  /// Connect a pool for every `selector -> database url` entry.
  pub async fn connect(urls: &HashMap<String, String>) -> Result<Self, sqlx::Error> {
    let mut pools = HashMap::with_capacity(urls.len());
    for (selector, url) in urls {
      let pool = SqlitePoolOptions::new().connect(url).await?;
      info!(selector = %selector, "db_source_pool_connected");
      pools.insert(selector.clone(), pool);
    }
    Ok(Self::new(pools))
  }

  pub fn pool(&self, selector: &str) -> Option<&SqlitePool> {
    self.pools.get(selector)
  }
}

#[async_trait]
impl SourceEvaluator for DbSourceEvaluator {
  fn source_type(&self) -> &str {
    DB_SOURCE_TYPE
  }

  async fn evaluate(&self, request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
    let properties = request.properties();

    let query = request
      .property_str("query")
      .ok_or_else(|| SourceError::invalid_config("source-db requires a 'query'"))?;

    let Some(values) = input_key_values(properties, request.resolved)? else {
      debug!(
        assignment = %request.assignment.name,
        "db_source_inputs_missing"
      );
      return Ok(SourceValue::NotFound);
    };

    let selector = request
      .property_str("endpoint-selector")
      .unwrap_or(DEFAULT_DB_SELECTOR);
    let pool = self.pool(selector).ok_or_else(|| {
      SourceError::invalid_config(format!("no database configured for '{}'", selector))
    })?;

    let named = NamedQuery::parse(query);
    let mut sql = sqlx::query(&named.sql);
    for param in &named.params {
      let value = values.get(param).ok_or_else(|| {
        SourceError::invalid_config(format!(
          "query parameter ':{}' is not in input-key-mapping",
          param
        ))
      })?;
      sql = match value {
        serde_json::Value::String(s) => sql.bind(s.clone()),
        serde_json::Value::Bool(b) => sql.bind(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
          Some(i) => sql.bind(i),
          None => sql.bind(n.as_f64()),
        },
        other => sql.bind(other.to_string()),
      };
    }

    let rows = sql
      .fetch_all(pool)
      .await
      .map_err(|e| SourceError::request(format!("query failed: {}", e)))?;

    if rows.is_empty() {
      debug!(assignment = %request.assignment.name, "db_source_no_rows");
      return Ok(SourceValue::NotFound);
    }

    let rows = rows
      .iter()
      .map(row_to_json)
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| SourceError::request(format!("failed to decode row: {}", e)))?;

    let mapping = output_key_mapping(properties)?;
    let data_type = request.data_type();

    // A single-column row stands for its value when nothing is mapped.
    let value = if mapping.is_empty() && data_type.is_primitive() {
      rows
        .first()
        .and_then(|row| row.as_object())
        .filter(|row| row.len() == 1)
        .and_then(|row| row.values().next().cloned())
    } else {
      extract_output(&serde_json::Value::Array(rows), None, &mapping, &data_type)
    };

    Ok(match value {
      Some(value) if !value.is_null() => SourceValue::Resolved(value),
      _ => SourceValue::NotFound,
    })
  }
}
