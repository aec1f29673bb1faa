use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// A query with `:name` parameters rewritten to positional `?` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
  pub sql: String,
  /// Parameter names in placeholder order. A name used twice appears twice.
  pub params: Vec<String>,
}

impl NamedQuery {
  /// Rewrite named parameters. Quoted literals and `::` casts are left alone.
  pub fn parse(query: &str) -> Self {
    let chars: Vec<char> = query.chars().collect();
    let mut sql = String::with_capacity(query.len());
    let mut params = Vec::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
      let c = chars[i];

      if let Some(q) = quote {
        sql.push(c);
        if c == q {
          quote = None;
        }
        i += 1;
        continue;
      }

      match c {
        '\'' | '"' => {
          quote = Some(c);
          sql.push(c);
          i += 1;
        }
        ':' if chars.get(i + 1) == Some(&':') => {
          sql.push_str("::");
          i += 2;
        }
        ':' if chars
          .get(i + 1)
          .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
        {
          let start = i + 1;
          let mut end = start;
          while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
            end += 1;
          }
          params.push(chars[start..end].iter().collect());
          sql.push('?');
          i = end;
        }
        _ => {
          sql.push(c);
          i += 1;
        }
      }
    }

    Self { sql, params }
  }
}

/// Convert a row into a JSON object keyed by column name, using the storage
/// class of each value.
pub fn row_to_json(row: &SqliteRow) -> Result<serde_json::Value, sqlx::Error> {
  let mut object = serde_json::Map::new();

  for column in row.columns() {
    let i = column.ordinal();
    let raw = row.try_get_raw(i)?;

    let value = if raw.is_null() {
      serde_json::Value::Null
    } else {
      match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => serde_json::Value::from(row.try_get::<i64, _>(i)?),
        "REAL" => serde_json::Number::from_f64(row.try_get::<f64, _>(i)?)
          .map(serde_json::Value::Number)
          .unwrap_or(serde_json::Value::Null),
        "BLOB" => {
          let bytes: Vec<u8> = row.try_get(i)?;
          serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => serde_json::Value::String(row.try_get::<String, _>(i)?),
      }
    };

    object.insert(column.name().to_string(), value);
  }

  Ok(serde_json::Value::Object(object))
}
