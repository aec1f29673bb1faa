use std::collections::HashMap;

use async_trait::async_trait;
use cds_component::{ComponentError, ComponentNode, StepAttributes, StepContext, parse_inputs};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const RESTFUL_COMPONENT: &str = "component-restful";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RestfulInput {
  #[serde(default = "default_method")]
  method: String,
  url: String,
  #[serde(default)]
  headers: HashMap<String, String>,
  #[serde(default)]
  body: Option<serde_json::Value>,
  /// Accepted status codes; any 2xx when empty.
  #[serde(default)]
  expected_status: Vec<u16>,
}

fn default_method() -> String {
  "GET".to_string()
}

/// Sends one HTTP request and reports the response.
#[derive(Debug, Clone, Default)]
pub struct RestfulComponent {
  client: Client,
}

impl RestfulComponent {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_client(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl ComponentNode for RestfulComponent {
  fn name(&self) -> &str {
    RESTFUL_COMPONENT
  }

  fn validate(&self, _ctx: &StepContext, inputs: &serde_json::Value) -> Result<(), ComponentError> {
    let input: RestfulInput = parse_inputs(inputs)?;
    parse_method(&input.method)?;
    if input.url.is_empty() {
      return Err(ComponentError::invalid_input("url", "must not be empty"));
    }
    Ok(())
  }

  async fn process(
    &self,
    ctx: &StepContext,
    inputs: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError> {
    let input: RestfulInput = parse_inputs(inputs)?;
    let method = parse_method(&input.method)?;

    let mut request = self.client.request(method, &input.url);
    for (key, value) in &input.headers {
      request = request.header(key, value);
    }
    request = match &input.body {
      Some(serde_json::Value::String(text)) => request.body(text.clone()),
      Some(body) => request.json(body),
      None => request,
    };

    debug!(step = %ctx.step_name, url = %input.url, "restful_request_started");

    let response = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(ComponentError::Cancelled),
      response = request.send() => response
        .map_err(|e| ComponentError::execution(format!("request to {} failed: {}", input.url, e)))?,
    };

    let status = response.status().as_u16();
    let headers: HashMap<String, String> = response
      .headers()
      .iter()
      .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
      .collect();
    let body = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(ComponentError::Cancelled),
      body = response.text() => body
        .map_err(|e| ComponentError::execution(format!("failed to read response: {}", e)))?,
    };
    let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));

    let data = json!({ "status": status, "headers": headers, "body": body });

    let accepted = if input.expected_status.is_empty() {
      (200..300).contains(&status)
    } else {
      input.expected_status.contains(&status)
    };
    if !accepted {
      return Ok(
        StepAttributes::failure(data)
          .with_attribute("error", format!("unexpected status {} from {}", status, input.url)),
      );
    }

    Ok(StepAttributes::success(data))
  }
}

fn parse_method(method: &str) -> Result<Method, ComponentError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    _ => Err(ComponentError::invalid_input(
      "method",
      format!("unsupported HTTP method: {}", method),
    )),
  }
}
