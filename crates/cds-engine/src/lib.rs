//! CDS Workflow Engine
//!
//! Executes blueprint workflows: each step resolves the resource assignments
//! of its node template and then drives the bound component node.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ExecutionRunner                        │
//! │  - owns mpsc channel of requests                            │
//! │  - start(cancel) spawns one task per request                │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExecutionService                        │
//! │  - execute(input) → ExecutionServiceOutput, never fails     │
//! │  - blueprint catalog + cached workflow graphs               │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    WorkflowExecutor                         │
//! │  - step state machine, loop bound, timeouts, cancellation   │
//! │  - input rendering via minijinja                            │
//! │  - resource resolution, validate/process/recover            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cache;
mod catalog;
mod config;
mod error;
mod events;
mod executor;
mod input;
mod runner;
mod service;
mod state;

pub use cache::{GraphCache, GraphKey};
pub use catalog::{BlueprintCatalog, FsBlueprintCatalog, InMemoryBlueprintCatalog};
pub use config::ExecutorConfig;
pub use error::{CatalogError, ExecutionError, StepError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::{ExecutionResult, StepExecution, WorkflowExecutor};
pub use input::resolve_inputs;
pub use runner::{ExecutionHandle, ExecutionRunner};
pub use service::ExecutionService;
pub use state::StepPhase;
