use cds_config::DataType;
use serde_json::Value;

use crate::error::SourceError;

/// Coerce a resolved value to the declared type.
///
/// Scalars supplied as strings are parsed, so a payload of `{"port": "830"}`
/// resolves an integer assignment to `830`. `json` values pass through
/// untouched.
pub fn coerce_value(value: Value, data_type: &DataType) -> Result<Value, SourceError> {
  match data_type {
    DataType::String => match value {
      Value::String(_) => Ok(value),
      Value::Number(n) => Ok(Value::String(n.to_string())),
      Value::Bool(b) => Ok(Value::String(b.to_string())),
      other => Err(mismatch("string", &other)),
    },

    DataType::Integer => match &value {
      Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
      Value::Number(n) => match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
          Ok(Value::Number((f as i64).into()))
        }
        _ => Err(mismatch("integer", &value)),
      },
      Value::String(s) => s
        .trim()
        .parse::<i64>()
        .map(|n| Value::Number(n.into()))
        .map_err(|_| mismatch("integer", &value)),
      _ => Err(mismatch("integer", &value)),
    },

    DataType::Float => match &value {
      Value::Number(_) => Ok(value),
      Value::String(s) => s
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| mismatch("float", &value)),
      _ => Err(mismatch("float", &value)),
    },

    DataType::Boolean => match &value {
      Value::Bool(_) => Ok(value),
      Value::String(s) => match s.trim().to_lowercase().as_str() {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Err(mismatch("boolean", &value)),
      },
      _ => Err(mismatch("boolean", &value)),
    },

    DataType::List => match value {
      Value::Array(_) => Ok(value),
      Value::String(ref s) => match serde_json::from_str::<Value>(s) {
        Ok(parsed @ Value::Array(_)) => Ok(parsed),
        _ => Err(mismatch("list", &value)),
      },
      other => Err(mismatch("list", &other)),
    },

    DataType::Map => match value {
      Value::Object(_) => Ok(value),
      Value::String(ref s) => match serde_json::from_str::<Value>(s) {
        Ok(parsed @ Value::Object(_)) => Ok(parsed),
        _ => Err(mismatch("map", &value)),
      },
      other => Err(mismatch("map", &other)),
    },

    DataType::Json => Ok(value),

    DataType::Complex(name) => match value {
      Value::Object(_) => Ok(value),
      Value::String(ref s) => match serde_json::from_str::<Value>(s) {
        Ok(parsed @ Value::Object(_)) => Ok(parsed),
        _ => Err(mismatch(name, &value)),
      },
      other => Err(mismatch(name, &other)),
    },
  }
}

fn mismatch(expected: &str, value: &Value) -> SourceError {
  SourceError::Coercion {
    expected: expected.to_string(),
    message: format!("got {}", value),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_coerce_string() {
    assert_eq!(
      coerce_value(json!("abc"), &DataType::String).unwrap(),
      json!("abc")
    );
    assert_eq!(coerce_value(json!(42), &DataType::String).unwrap(), json!("42"));
    assert!(coerce_value(json!({"a": 1}), &DataType::String).is_err());
  }

  #[test]
  fn test_coerce_integer() {
    assert_eq!(coerce_value(json!("42"), &DataType::Integer).unwrap(), json!(42));
    assert_eq!(coerce_value(json!(7.0), &DataType::Integer).unwrap(), json!(7));
    assert!(coerce_value(json!(7.5), &DataType::Integer).is_err());
    assert!(coerce_value(json!("abc"), &DataType::Integer).is_err());
  }

  #[test]
  fn test_coerce_float_and_boolean() {
    assert_eq!(coerce_value(json!("1.5"), &DataType::Float).unwrap(), json!(1.5));
    assert_eq!(coerce_value(json!(3), &DataType::Float).unwrap(), json!(3));
    assert_eq!(
      coerce_value(json!("TRUE"), &DataType::Boolean).unwrap(),
      json!(true)
    );
    assert!(coerce_value(json!("yes"), &DataType::Boolean).is_err());
  }

  #[test]
  fn test_coerce_collections() {
    assert_eq!(
      coerce_value(json!("[1, 2]"), &DataType::List).unwrap(),
      json!([1, 2])
    );
    assert!(coerce_value(json!({"a": 1}), &DataType::List).is_err());
    assert_eq!(
      coerce_value(json!("{\"a\": 1}"), &DataType::Map).unwrap(),
      json!({"a": 1})
    );
    assert_eq!(
      coerce_value(json!("free text"), &DataType::Json).unwrap(),
      json!("free text")
    );
    let complex = DataType::Complex("dt-vnf".to_string());
    assert_eq!(
      coerce_value(json!({"id": 1}), &complex).unwrap(),
      json!({"id": 1})
    );
    assert!(matches!(
      coerce_value(json!(1), &complex),
      Err(SourceError::Coercion { expected, .. }) if expected == "dt-vnf"
    ));
  }
}
