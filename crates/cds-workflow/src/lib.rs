//! CDS Workflow
//!
//! This crate turns a declarative workflow definition into a validated,
//! immutable graph that is ready for execution.
//!
//! Key differences from `cds-config`'s `WorkflowDef`:
//! - Every transition is checked to reference an existing step
//! - Trivial self loops are rejected; longer cycles are allowed
//! - The single entry step is identified
//! - Success/failure transitions are indexed for O(1) lookup

mod error;
mod graph;

pub use error::WorkflowError;
pub use graph::{Transition, WorkflowGraph};
