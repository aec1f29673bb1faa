use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A REST system a source can select by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RestEndpoint {
  /// Base URL, e.g. `http://sdnc:8282/restconf`.
  pub url: String,

  /// Headers sent with every request to this endpoint.
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub headers: HashMap<String, String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub username: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
}

impl RestEndpoint {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      headers: HashMap::new(),
      username: None,
      password: None,
    }
  }

  pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
    self.username = Some(username.into());
    self.password = Some(password.into());
    self
  }

  /// Join a request path onto the base URL. Absolute URLs are used as is.
  pub fn resolve_url(&self, path: &str) -> Result<url::Url, url::ParseError> {
    if path.starts_with("http://") || path.starts_with("https://") {
      return url::Url::parse(path);
    }

    let base = self.url.trim_end_matches('/');
    if path.is_empty() {
      url::Url::parse(base)
    } else if path.starts_with('/') {
      url::Url::parse(&format!("{}{}", base, path))
    } else {
      url::Url::parse(&format!("{}/{}", base, path))
    }
  }
}

/// Endpoints keyed by selector name.
pub type RestEndpoints = HashMap<String, RestEndpoint>;

/// Connection retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RestSourceConfig {
  /// Retries after a connection-level failure.
  pub max_retries: u32,
  /// Fixed delay between retries.
  pub retry_delay_ms: u64,
}

impl Default for RestSourceConfig {
  fn default() -> Self {
    Self {
      max_retries: 2,
      retry_delay_ms: 200,
    }
  }
}
