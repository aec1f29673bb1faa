use serde::{Deserialize, Serialize};

/// Typed property definition shared by resource assignments and dictionary
/// definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PropertyDefinition {
  /// Declared type, e.g. "string", "integer", "list" or a complex data type name.
  #[serde(rename = "type", default = "default_type")]
  pub property_type: String,

  /// Element type for `list` properties.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub entry_schema: Option<String>,

  /// Whether resolution must produce a value.
  #[serde(default = "default_required")]
  pub required: bool,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<serde_json::Value>,

  /// Resolved value. Set in place during resolution.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<serde_json::Value>,
}

fn default_type() -> String {
  "string".to_string()
}

fn default_required() -> bool {
  true
}

impl Default for PropertyDefinition {
  fn default() -> Self {
    Self {
      property_type: default_type(),
      entry_schema: None,
      required: default_required(),
      default: None,
      value: None,
    }
  }
}

impl PropertyDefinition {
  /// Create a required property of the given type.
  pub fn of_type(property_type: impl Into<String>) -> Self {
    Self {
      property_type: property_type.into(),
      ..Self::default()
    }
  }

  pub fn data_type(&self) -> DataType {
    DataType::parse(&self.property_type)
  }
}

/// Data type classification used for value coercion and output mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
  String,
  Integer,
  Float,
  Boolean,
  List,
  Map,
  Json,
  /// A named complex data type.
  Complex(String),
}

impl DataType {
  pub fn parse(name: &str) -> Self {
    match name {
      "string" | "timestamp" => DataType::String,
      "integer" => DataType::Integer,
      "float" | "number" => DataType::Float,
      "boolean" => DataType::Boolean,
      "list" => DataType::List,
      "map" => DataType::Map,
      "json" => DataType::Json,
      other => DataType::Complex(other.to_string()),
    }
  }

  /// Whether the type is a scalar.
  pub fn is_primitive(&self) -> bool {
    matches!(
      self,
      DataType::String | DataType::Integer | DataType::Float | DataType::Boolean
    )
  }
}
