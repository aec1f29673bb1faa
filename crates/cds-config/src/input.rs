//! Input value types for node template configuration.
//!
//! Input values are JSON values whose string leaves are template strings
//! resolved by minijinja at runtime, against the request inputs, the resolved
//! resources and the response data of previously executed steps.
//!
//! # Examples
//!
//! ```json
//! {
//!   "url": "http://{{ resources['vnf-host'] }}/config",
//!   "commands": ["show version", "show interfaces {{ inputs.port }}"],
//!   "timeout": 30
//! }
//! ```
//!
//! Non-string leaves (numbers, booleans, null) are passed through untouched.

/// An input value whose string leaves are templates.
pub type InputValue = serde_json::Value;
