use async_trait::async_trait;
use cds_resolution::{SourceError, SourceEvaluator, SourceRequest, SourceValue};

use crate::endpoint::{RestEndpoints, RestSourceConfig};
use crate::rest::RestSourceEvaluator;

pub(crate) const AAI_SOURCE_TYPE: &str = "source-aai";

/// Endpoint selector used unless the source overrides it.
pub const AAI_ENDPOINT_SELECTOR: &str = "aai-data";

const AAI_APP_ID: &str = "cds";

/// REST source bound to the AAI inventory.
#[derive(Debug, Clone)]
pub struct AaiSourceEvaluator {
  inner: RestSourceEvaluator,
}

impl AaiSourceEvaluator {
  pub fn new(endpoints: RestEndpoints, config: RestSourceConfig) -> Self {
    Self {
      inner: RestSourceEvaluator::new(endpoints, config),
    }
  }

  pub fn from_rest(inner: RestSourceEvaluator) -> Self {
    Self { inner }
  }
}

#[async_trait]
impl SourceEvaluator for AaiSourceEvaluator {
  fn source_type(&self) -> &str {
    AAI_SOURCE_TYPE
  }

  async fn evaluate(&self, request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
    let headers = vec![
      ("X-FromAppId".to_string(), AAI_APP_ID.to_string()),
      (
        "X-TransactionId".to_string(),
        request.context.request_id.clone(),
      ),
      ("Accept".to_string(), "application/json".to_string()),
    ];
    self
      .inner
      .evaluate_with(request, AAI_ENDPOINT_SELECTOR, &headers)
      .await
  }
}
