//! Ensemble SDK
//!
//! Shared library providing the contracts between the orchestration engine and
//! the workers it delegates to: the capability trait, the artifacts that flow
//! between plan steps, and the error taxonomy.

/// Capability trait and descriptor types
pub mod capability;

/// Error types and handling
pub mod errors;

/// Tabular dataset types
pub mod dataset;

/// Step artifacts and context slots
pub mod artifact;

/// Step parameter types
pub mod types;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactKind, ContextSlot};
pub use capability::{Capability, CapabilityDescriptor, Invocation};
pub use dataset::{CellValue, Dataset, DatasetError};
pub use errors::{CapabilityError, EngineError, EnsembleErrorExt};
pub use types::StepParams;
