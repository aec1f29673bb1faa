//! Helpers shared by the external source evaluators: input key mapping,
//! templating of request parts and output key mapping of responses.

use std::collections::HashMap;

use cds_config::DataType;
use minijinja::Environment;
use serde_json::{Map, Value};

use crate::error::SourceError;

/// Resolve the `input-key-mapping` source property (parameter name ->
/// assignment name) against the already-resolved values.
///
/// Returns `None` when a mapped assignment has no value yet, which evaluators
/// treat as a soft miss.
pub fn input_key_values(
  properties: &Value,
  resolved: &HashMap<String, Value>,
) -> Result<Option<Map<String, Value>>, SourceError> {
  let mut values = Map::new();

  let Some(mapping) = properties.get("input-key-mapping") else {
    return Ok(Some(values));
  };
  let mapping = mapping
    .as_object()
    .ok_or_else(|| SourceError::invalid_config("input-key-mapping must be an object"))?;

  for (param, assignment) in mapping {
    let assignment = assignment.as_str().ok_or_else(|| {
      SourceError::invalid_config(format!("input-key-mapping '{}' must name an assignment", param))
    })?;
    match resolved.get(assignment) {
      Some(value) if !value.is_null() => {
        values.insert(param.clone(), value.clone());
      }
      _ => return Ok(None),
    }
  }

  Ok(Some(values))
}

/// Render a request template against the input key values.
///
/// Both `$name` placeholders and minijinja expressions (`{{ name }}`) are
/// supported.
pub fn render_template(template: &str, values: &Map<String, Value>) -> Result<String, SourceError> {
  let mut rendered = template.to_string();

  if rendered.contains('$') {
    // Longest names first so `$vnf-id` does not clobber `$vnf-id-list`.
    let mut keys: Vec<&String> = values.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
    for key in keys {
      let replacement = match &values[key.as_str()] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
      };
      rendered = rendered.replace(&format!("${}", key), &replacement);
    }
  }

  if rendered.contains("{{") || rendered.contains("{%") {
    let env = Environment::new();
    rendered = env
      .render_str(&rendered, Value::Object(values.clone()))
      .map_err(|e| SourceError::invalid_config(format!("failed to render template: {}", e)))?;
  }

  Ok(rendered)
}

/// Parse the `output-key-mapping` source property (output name -> response
/// field).
pub fn output_key_mapping(properties: &Value) -> Result<Vec<(String, String)>, SourceError> {
  let Some(mapping) = properties.get("output-key-mapping") else {
    return Ok(Vec::new());
  };
  let mapping = mapping
    .as_object()
    .ok_or_else(|| SourceError::invalid_config("output-key-mapping must be an object"))?;

  mapping
    .iter()
    .map(|(output, field)| {
      field
        .as_str()
        .map(|f| (output.clone(), f.to_string()))
        .ok_or_else(|| {
          SourceError::invalid_config(format!("output-key-mapping '{}' must name a field", output))
        })
    })
    .collect()
}

/// Extract the assignment value from a response node.
///
/// `path` is an optional JSON pointer applied first. Primitive types take the
/// first mapped field (from the first array element that has it), or the node
/// itself when it is a scalar and no field is mapped. Lists project every element through the
/// mapping. Complex types project the object through the mapping.
///
/// Returns `None` when the response does not carry the value.
pub fn extract_output(
  node: &Value,
  path: Option<&str>,
  mapping: &[(String, String)],
  data_type: &DataType,
) -> Option<Value> {
  let node = match path {
    Some(pointer) if !pointer.is_empty() => node.pointer(pointer)?,
    _ => node,
  };
  if node.is_null() {
    return None;
  }

  let value = match data_type {
    t if t.is_primitive() => extract_primitive(node, mapping)?,
    DataType::List => extract_list(node, mapping),
    DataType::Json => node.clone(),
    _ => {
      if mapping.is_empty() {
        node.clone()
      } else {
        let element = match node {
          Value::Array(items) => items.first()?,
          other => other,
        };
        project(element, mapping)?
      }
    }
  };

  (!value.is_null()).then_some(value)
}

fn extract_primitive(node: &Value, mapping: &[(String, String)]) -> Option<Value> {
  let field = mapping.first().map(|(_, field)| field.as_str());

  let element = match node {
    Value::Array(items) => match field {
      Some(field) => items.iter().find(|item| item.get(field).is_some())?,
      None => items.first()?,
    },
    other => other,
  };

  match (element, field) {
    (Value::Object(obj), Some(field)) => obj.get(field).cloned(),
    (Value::Object(_), None) => Some(element.clone()),
    // A mapped field cannot exist on a scalar.
    (_, Some(_)) => None,
    (scalar, None) => Some(scalar.clone()),
  }
}

fn extract_list(node: &Value, mapping: &[(String, String)]) -> Value {
  let items: Vec<Value> = match node {
    Value::Array(items) => items.clone(),
    other => vec![other.clone()],
  };

  if mapping.is_empty() {
    return Value::Array(items);
  }

  Value::Array(
    items
      .iter()
      .filter_map(|item| project(item, mapping))
      .collect(),
  )
}

fn project(node: &Value, mapping: &[(String, String)]) -> Option<Value> {
  let obj = node.as_object()?;
  let projected: Map<String, Value> = mapping
    .iter()
    .map(|(output, field)| (output.clone(), obj.get(field).cloned().unwrap_or(Value::Null)))
    .collect();
  Some(Value::Object(projected))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_input_key_values() {
    let props = json!({ "input-key-mapping": { "vnf_id": "vnf-id" } });
    let mut resolved = HashMap::new();
    assert_eq!(input_key_values(&props, &resolved).unwrap(), None);

    resolved.insert("vnf-id".to_string(), json!("v-1"));
    let values = input_key_values(&props, &resolved).unwrap().unwrap();
    assert_eq!(values["vnf_id"], "v-1");

    let bad = json!({ "input-key-mapping": ["vnf-id"] });
    assert!(input_key_values(&bad, &resolved).is_err());
  }

  #[test]
  fn test_render_template_both_syntaxes() {
    let mut values = Map::new();
    values.insert("vnf-id".to_string(), json!("v-1"));
    values.insert("vnf-id-list".to_string(), json!("a,b"));
    values.insert("service".to_string(), json!("svc"));

    let rendered = render_template("/vnfs/$vnf-id?list=$vnf-id-list", &values).unwrap();
    assert_eq!(rendered, "/vnfs/v-1?list=a,b");

    let rendered = render_template("/services/{{ service | upper }}", &values).unwrap();
    assert_eq!(rendered, "/services/SVC");
  }

  #[test]
  fn test_extract_primitive() {
    let body = json!({ "data": [{ "other": 1 }, { "ip": "10.0.0.1" }] });
    let mapping = vec![("vnf-ip".to_string(), "ip".to_string())];

    assert_eq!(
      extract_output(&body, Some("/data"), &mapping, &DataType::String),
      Some(json!("10.0.0.1"))
    );
    assert_eq!(
      extract_output(&json!("plain"), None, &[], &DataType::String),
      Some(json!("plain"))
    );
    assert_eq!(
      extract_output(&body, Some("/missing"), &mapping, &DataType::String),
      None
    );
  }

  #[test]
  fn test_extract_primitive_mapped_field_on_scalar() {
    let mapping = vec![("vnf-name".to_string(), "name".to_string())];

    assert_eq!(
      extract_output(&json!("<html>502</html>"), None, &mapping, &DataType::String),
      None
    );
    assert_eq!(
      extract_output(&json!(["a", "b"]), None, &mapping, &DataType::String),
      None
    );
  }

  #[test]
  fn test_extract_list_projects_elements() {
    let body = json!([
      { "name": "eth0", "mtu": 1500 },
      { "name": "eth1", "mtu": 9000 }
    ]);
    let mapping = vec![("if-name".to_string(), "name".to_string())];

    assert_eq!(
      extract_output(&body, None, &mapping, &DataType::List),
      Some(json!([{ "if-name": "eth0" }, { "if-name": "eth1" }]))
    );
  }

  #[test]
  fn test_extract_complex_projects_object() {
    let body = json!({ "vnf": { "id": "v-1", "name": "fw", "extra": true } });
    let mapping = vec![
      ("vnf-id".to_string(), "id".to_string()),
      ("vnf-name".to_string(), "name".to_string()),
    ];

    assert_eq!(
      extract_output(
        &body,
        Some("/vnf"),
        &mapping,
        &DataType::Complex("dt-vnf".to_string())
      ),
      Some(json!({ "vnf-id": "v-1", "vnf-name": "fw" }))
    );
  }
}
