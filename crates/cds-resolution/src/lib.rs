//! CDS resource resolution.
//!
//! Resolves a set of [`ResourceAssignment`]s by ordering them on their
//! dependencies and walking each assignment's source chain until a source
//! produces a value.
//!
//! Sources are pluggable through the [`SourceEvaluator`] trait. The `input`
//! and `default` evaluators live here; database and REST evaluators are
//! provided by their own crates and registered by the host.
//!
//! [`ResourceAssignment`]: cds_config::ResourceAssignment

mod coerce;
mod error;
pub mod mapping;
mod resolver;
mod sequence;
mod source;
mod sources;

pub use coerce::coerce_value;
pub use error::{AssignmentFailure, ResolveError, SourceError};
pub use resolver::{ResolutionOutcome, ResolverConfig, ResourceResolver};
pub use sequence::{effective_dependencies, sequence_batches, topological_order};
pub use source::{
  ResolutionContext, SourceEvaluator, SourceRegistry, SourceRequest, SourceValue,
};
pub use sources::{DefaultSource, InputSource};
