use async_trait::async_trait;

use crate::coerce::coerce_value;
use crate::error::SourceError;
use crate::source::{SourceEvaluator, SourceRequest, SourceValue};
use crate::sources::DEFAULT_SOURCE_TYPE;

/// Returns the assignment's declared default, else the dictionary
/// definition's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSource;

#[async_trait]
impl SourceEvaluator for DefaultSource {
  fn source_type(&self) -> &str {
    DEFAULT_SOURCE_TYPE
  }

  async fn evaluate(&self, request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
    let default = request
      .assignment
      .property
      .default
      .as_ref()
      .or_else(|| request.definition.and_then(|d| d.property.default.as_ref()));

    match default {
      Some(value) if !value.is_null() => {
        let value = coerce_value(value.clone(), &request.data_type())?;
        Ok(SourceValue::Resolved(value))
      }
      _ => Ok(SourceValue::NotFound),
    }
  }
}
