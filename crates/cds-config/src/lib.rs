//! CDS Config
//!
//! This crate contains the serializable blueprint configuration types for CDS.
//! These types represent blueprint definitions before they are validated and
//! turned into runtime structures by the engine.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--blueprint-file=blueprint.json`)
//! - A blueprint catalog (as JSON documents)
//!
//! The execution envelope ([`ExecutionServiceInput`] / [`ExecutionServiceOutput`])
//! also lives here since it is shared by the engine and every component.

mod assignment;
mod blueprint;
mod dictionary;
mod execution;
mod input;
mod node_template;
mod property;
mod workflow;

pub use assignment::{AssignmentStatus, ResourceAssignment};
pub use blueprint::BlueprintDef;
pub use dictionary::{ResourceDefinition, SourceDefinition};
pub use execution::{
  ActionIdentifiers, CommonHeader, ExecutionServiceInput, ExecutionServiceOutput, ExecutionStatus,
  Status, StepRecord, StepStatus,
};
pub use input::InputValue;
pub use node_template::NodeTemplateDef;
pub use property::{DataType, PropertyDefinition};
pub use workflow::{StepDef, WorkflowDef};
