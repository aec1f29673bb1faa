//! The `source-capability` resource source.
//!
//! Hands an assignment to a named capability together with the values of its
//! dependencies. A capability is either native code registered with the
//! evaluator (`script-type: internal`) or a Lua chunk (`script-type: lua`)
//! that sees `dependencies`, `assignment`, `properties` and `context` globals
//! and returns the value, or `nil` for a miss.

mod capability;
mod lua;
mod source;

pub use capability::{CapabilityRegistry, ResolutionCapability};
pub use source::{CAPABILITY_SOURCE_TYPE, CapabilitySourceEvaluator};
