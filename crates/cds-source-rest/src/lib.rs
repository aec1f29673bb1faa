//! HTTP backed resource sources.
//!
//! [`RestSourceEvaluator`] (`source-rest`) renders the request from the
//! dictionary source properties and extracts the value from the JSON response.
//! [`AaiSourceEvaluator`] (`source-aai`) is the same evaluator bound to the
//! `aai-data` endpoint with the AAI request headers.
//!
//! Source properties understood by both:
//!
//! ```json
//! {
//!   "endpoint-selector": "sdnc",
//!   "verb": "GET",
//!   "url-path": "/config/vnfs/$vnf-id",
//!   "payload": "{\"id\": \"$vnf-id\"}",
//!   "headers": { "X-Trace": "cds" },
//!   "path": "/vnf/0",
//!   "input-key-mapping": { "vnf-id": "vnf-id" },
//!   "output-key-mapping": { "vnf-name": "name" }
//! }
//! ```

mod aai;
mod endpoint;
mod rest;

pub use aai::{AAI_ENDPOINT_SELECTOR, AaiSourceEvaluator};
pub use endpoint::{RestEndpoint, RestEndpoints, RestSourceConfig};
pub use rest::RestSourceEvaluator;
