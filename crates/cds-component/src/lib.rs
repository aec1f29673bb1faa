//! CDS component node contract.
//!
//! A component node is the function a workflow step drives. The executor
//! calls [`ComponentNode::validate`] on the rendered inputs, then
//! [`ComponentNode::process`], and [`ComponentNode::recover`] when the step
//! fails. Nodes are stateless and registered by name in a
//! [`ComponentRegistry`] when the host starts.

mod attributes;
mod context;
mod error;
mod node;
mod registry;

pub use attributes::StepAttributes;
pub use context::StepContext;
pub use error::ComponentError;
pub use node::{ComponentNode, parse_inputs};
pub use registry::{ComponentRegistry, InMemoryComponentRegistry};
