//! The `processor-db` resource source.
//!
//! Runs the SQL `query` declared by a dictionary source against a named
//! SQLite pool. Named parameters (`:vnf_id`) are bound from the source's
//! `input-key-mapping`; the value is read from the returned rows through the
//! `output-key-mapping`.

mod query;
mod source;

pub use query::{NamedQuery, row_to_json};
pub use source::{DB_SOURCE_TYPE, DEFAULT_DB_SELECTOR, DbSourceEvaluator};
