//! Conductor System
//!
//! Compiles requests into plans and runs them against the registered
//! capabilities, threading intermediate artifacts through a per-request
//! shared context.

pub mod collector;
pub mod compiler;
pub mod context;
pub mod executor;
pub mod orchestrator;
pub mod registry;
pub mod types;

pub use collector::ResultCollector;
pub use compiler::PlanCompiler;
pub use context::{SharedContext, SlotMismatch};
pub use executor::PlanExecutor;
pub use orchestrator::Orchestrator;
pub use registry::{CapabilityRegistry, CapabilityRegistryBuilder, Catalog};
pub use types::{ExecutionResult, ExecutionState, TaskPlan, TaskStep};
