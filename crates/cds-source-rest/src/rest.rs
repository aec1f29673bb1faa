use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cds_resolution::mapping::{extract_output, input_key_values, output_key_mapping, render_template};
use cds_resolution::{SourceError, SourceEvaluator, SourceRequest, SourceValue};
use reqwest::{Client, Method};
use tracing::{debug, warn};

use crate::endpoint::{RestEndpoint, RestEndpoints, RestSourceConfig};

pub(crate) const REST_SOURCE_TYPE: &str = "source-rest";

/// Resolves values by calling a REST endpoint.
#[derive(Debug, Clone)]
pub struct RestSourceEvaluator {
  client: Client,
  endpoints: Arc<RestEndpoints>,
  config: RestSourceConfig,
}

impl RestSourceEvaluator {
  pub fn new(endpoints: RestEndpoints, config: RestSourceConfig) -> Self {
    Self::with_client(Client::new(), endpoints, config)
  }

  pub fn with_client(client: Client, endpoints: RestEndpoints, config: RestSourceConfig) -> Self {
    Self {
      client,
      endpoints: Arc::new(endpoints),
      config,
    }
  }

  pub fn endpoint(&self, selector: &str) -> Option<&RestEndpoint> {
    self.endpoints.get(selector)
  }

  /// Evaluate with the given default endpoint selector and extra headers.
  pub(crate) async fn evaluate_with(
    &self,
    request: SourceRequest<'_>,
    default_selector: &str,
    extra_headers: &[(String, String)],
  ) -> Result<SourceValue, SourceError> {
    let properties = request.properties();

    let Some(values) = input_key_values(properties, request.resolved)? else {
      debug!(
        assignment = %request.assignment.name,
        "rest_source_inputs_missing"
      );
      return Ok(SourceValue::NotFound);
    };

    let selector = request
      .property_str("endpoint-selector")
      .unwrap_or(default_selector);
    let endpoint = self.endpoint(selector).ok_or_else(|| {
      SourceError::invalid_config(format!("no REST endpoint configured for '{}'", selector))
    })?;

    let path = render_template(request.property_str("url-path").unwrap_or(""), &values)?;
    let url = endpoint
      .resolve_url(&path)
      .map_err(|e| SourceError::invalid_config(format!("invalid url '{}': {}", path, e)))?;

    let method = parse_method(request.property_str("verb").unwrap_or("GET"))?;

    let payload = match request.property_str("payload") {
      Some(template) if !template.is_empty() => Some(render_template(template, &values)?),
      _ => None,
    };

    let mut headers: Vec<(String, String)> = endpoint
      .headers
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect();
    if let Some(declared) = properties.get("headers").and_then(|h| h.as_object()) {
      for (key, value) in declared {
        let value = match value.as_str() {
          Some(s) => render_template(s, &values)?,
          None => value.to_string(),
        };
        headers.push((key.clone(), value));
      }
    }
    headers.extend(extra_headers.iter().cloned());

    let response = self
      .send(endpoint, method, url.clone(), &headers, payload.as_deref())
      .await?;

    let status = response.status();
    if !status.is_success() {
      debug!(
        assignment = %request.assignment.name,
        url = %url,
        status = status.as_u16(),
        "rest_source_non_success"
      );
      return Ok(SourceValue::NotFound);
    }

    let body = response
      .text()
      .await
      .map_err(|e| SourceError::request(format!("failed to read response from {}: {}", url, e)))?;
    let body: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
      SourceError::request(format!("malformed payload from {}: {}", url, e))
    })?;

    let mapping = output_key_mapping(properties)?;
    let value = extract_output(
      &body,
      request.property_str("path"),
      &mapping,
      &request.data_type(),
    );

    Ok(match value {
      Some(value) => SourceValue::Resolved(value),
      None => SourceValue::NotFound,
    })
  }

  /// Send the request, retrying connection-level failures.
  async fn send(
    &self,
    endpoint: &RestEndpoint,
    method: Method,
    url: url::Url,
    headers: &[(String, String)],
    payload: Option<&str>,
  ) -> Result<reqwest::Response, SourceError> {
    let mut attempt = 0;

    loop {
      let mut builder = self.client.request(method.clone(), url.clone());
      for (key, value) in headers {
        builder = builder.header(key, value);
      }
      if let Some(username) = &endpoint.username {
        builder = builder.basic_auth(username, endpoint.password.as_ref());
      }
      if let Some(payload) = payload {
        builder = builder
          .header(reqwest::header::CONTENT_TYPE, "application/json")
          .body(payload.to_string());
      }

      match builder.send().await {
        Ok(response) => return Ok(response),
        Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.config.max_retries => {
          attempt += 1;
          warn!(
            url = %url,
            attempt,
            max_retries = self.config.max_retries,
            error = %e,
            "rest_source_retrying"
          );
          tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
        }
        Err(e) => {
          return Err(SourceError::request(format!("request to {} failed: {}", url, e)));
        }
      }
    }
  }
}

#[async_trait]
impl SourceEvaluator for RestSourceEvaluator {
  fn source_type(&self) -> &str {
    REST_SOURCE_TYPE
  }

  async fn evaluate(&self, request: SourceRequest<'_>) -> Result<SourceValue, SourceError> {
    let default_selector = request.source_name;
    self.evaluate_with(request, default_selector, &[]).await
  }
}

fn parse_method(verb: &str) -> Result<Method, SourceError> {
  match verb.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    _ => Err(SourceError::invalid_config(format!(
      "unsupported HTTP verb: {}",
      verb
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_method() {
    assert_eq!(parse_method("post").unwrap(), Method::POST);
    assert!(matches!(
      parse_method("TRACE"),
      Err(SourceError::InvalidConfig { .. })
    ));
  }
}
