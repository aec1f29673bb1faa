use async_trait::async_trait;

use crate::error::SourceError;
use crate::source::{SourceEvaluator, SourceRequest, SourceValue};
use crate::sources::INPUT_SOURCE_TYPE;

/// Reads the value from the request input payload.
///
/// The lookup key is the source `key` property, or the assignment name. A key
/// that is not a top-level field is walked as a dotted path into nested
/// objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSource;

#[async_trait]
impl SourceEvaluator for InputSource {
  fn source_type(&self) -> &str {
    INPUT_SOURCE_TYPE
  }

  async fn evaluate(&self, request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
    let key = request
      .property_str("key")
      .unwrap_or(request.assignment.name.as_str());

    match lookup(&request.context.payload, key) {
      Some(value) if !value.is_null() => Ok(SourceValue::Resolved(value.clone())),
      _ => Ok(SourceValue::NotFound),
    }
  }
}

fn lookup<'a>(payload: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
  if let Some(value) = payload.get(key) {
    return Some(value);
  }

  let mut current = payload;
  for segment in key.split('.') {
    current = match current {
      serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
      other => other.get(segment)?,
    };
  }
  Some(current)
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;
  use crate::source::ResolutionContext;
  use cds_config::{ResourceAssignment, SourceDefinition};
  use serde_json::json;

  async fn evaluate(
    assignment: &ResourceAssignment,
    source: Option<&SourceDefinition>,
    payload: serde_json::Value,
  ) -> SourceValue {
    let resolved = HashMap::new();
    let context = ResolutionContext::new("req-1", payload);
    InputSource
      .evaluate(SourceRequest {
        assignment,
        definition: None,
        source_name: "input",
        source,
        resolved: &resolved,
        context: &context,
      })
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn test_reads_by_assignment_name() {
    let ra = ResourceAssignment::new("pnf-id", "input");
    let value = evaluate(&ra, None, json!({ "pnf-id": "abc" })).await;
    assert_eq!(value, SourceValue::Resolved(json!("abc")));
  }

  #[tokio::test]
  async fn test_missing_or_null_is_not_found() {
    let ra = ResourceAssignment::new("pnf-id", "input");
    assert_eq!(evaluate(&ra, None, json!({})).await, SourceValue::NotFound);
    assert_eq!(
      evaluate(&ra, None, json!({ "pnf-id": null })).await,
      SourceValue::NotFound
    );
  }

  #[tokio::test]
  async fn test_dotted_key_property() {
    let ra = ResourceAssignment::new("vnf-host", "input");
    let source = SourceDefinition::new("source-input", json!({ "key": "vnf.hosts.1" }));
    let payload = json!({ "vnf": { "hosts": ["10.0.0.1", "10.0.0.2"] } });
    assert_eq!(
      evaluate(&ra, Some(&source), payload).await,
      SourceValue::Resolved(json!("10.0.0.2"))
    );
  }
}
