//! Built-in CDS component nodes.
//!
//! Each variant is an independent [`ComponentNode`] registered under its
//! `component-*` name. Use [`register_builtin`] to add all of them to a
//! registry at startup.

mod cli;
mod netconf;
mod process;
mod python;
mod restful;
mod script;

use cds_component::InMemoryComponentRegistry;

pub use cli::{CLI_COMPONENT, CliComponent};
pub use netconf::{NETCONF_COMPONENT, NetconfComponent};
pub use python::{PYTHON_COMPONENT, PythonComponent};
pub use restful::{RESTFUL_COMPONENT, RestfulComponent};
pub use script::{SCRIPT_COMPONENT, ScriptComponent};

/// Register every built-in component.
pub fn register_builtin(registry: &InMemoryComponentRegistry) {
  registry.register(ScriptComponent::new());
  registry.register(RestfulComponent::new());
  registry.register(CliComponent::new());
  registry.register(NetconfComponent::new());
  registry.register(PythonComponent::new());
}
