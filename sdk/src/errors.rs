//! Error types and handling
//!
//! This module provides the error types used throughout the Ensemble engine.
//! `EngineError` covers a whole request: plan compilation, dispatch, and the
//! surrounding configuration and provider plumbing. `CapabilityError` is what
//! an individual worker returns; the executor wraps it in
//! `EngineError::StepFailed` together with the step index and agent name.
//!
//! Step indices are zero-based positions in the plan.

use crate::artifact::{ArtifactKind, ContextSlot};
use thiserror::Error;

/// Trait for Ensemble error extensions
///
/// Provides a user-facing hint and whether retrying the request may help.
pub trait EnsembleErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors may succeed when the same request is retried
    /// (transient network failures, a different plan from the generator).
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Compile-time**: `MalformedPlan`, `UnknownCapability`, `SchemaViolation`
/// - **Dispatch-time**: `MissingPrecondition`, `SlotTypeMismatch`, `StepFailed`
/// - **Plumbing**: configuration, LLM provider, registry setup, timeouts
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, EnsembleErrorExt};
/// use sdk::ContextSlot;
///
/// let error = EngineError::MissingPrecondition {
///     step: 0,
///     agent: "DataAnalysisAgent".to_string(),
///     slot: ContextSlot::Dataset,
/// };
/// assert!(error.to_string().contains("dataset"));
/// assert!(error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out after {0}s")]
    RequestTimeout(u64),

    // Plan compilation errors
    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    #[error("Unknown capability '{agent}' at step {step}")]
    UnknownCapability { step: usize, agent: String },

    #[error("Step {step} ({agent}) is missing required field '{field}'")]
    SchemaViolation {
        step: usize,
        agent: String,
        field: String,
    },

    // Dispatch errors
    #[error("Step {step} ({agent}) requires context slot '{slot}', which no earlier step has written")]
    MissingPrecondition {
        step: usize,
        agent: String,
        slot: ContextSlot,
    },

    #[error("Step {step} ({agent}) produced a {found} artifact, which slot '{slot}' does not accept")]
    SlotTypeMismatch {
        step: usize,
        agent: String,
        slot: ContextSlot,
        found: ArtifactKind,
    },

    #[error("Step {step} ({agent}) failed: {source}")]
    StepFailed {
        step: usize,
        agent: String,
        #[source]
        source: CapabilityError,
    },

    // Registry errors
    #[error("Duplicate capability: {0}")]
    DuplicateCapability(String),
}

impl EngineError {
    /// Index of the plan step the error is attributed to, if any
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::UnknownCapability { step, .. }
            | Self::SchemaViolation { step, .. }
            | Self::MissingPrecondition { step, .. }
            | Self::SlotTypeMismatch { step, .. }
            | Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl EnsembleErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API key and network",
            Self::InvalidRequest(_) => "Describe the task to perform in the request text",
            Self::RequestTimeout(_) => "The request took too long. Try a smaller task",

            Self::MalformedPlan(_) => "The planner returned an unreadable plan. Try again",
            Self::UnknownCapability { .. } => "The plan referenced a worker that does not exist",
            Self::SchemaViolation { .. } => {
                "The plan is incomplete. Make sure the request names its data source"
            }

            Self::MissingPrecondition { .. } => {
                "A step needed data that no earlier step produced. Include a data source"
            }
            Self::SlotTypeMismatch { .. } => "A worker produced an unexpected kind of result",
            Self::StepFailed { source, .. } => source.user_hint(),

            Self::DuplicateCapability(_) => "Each worker may only be registered once",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Programming or setup errors; retrying the same request cannot help
            Self::Config(_) | Self::DuplicateCapability(_) | Self::SlotTypeMismatch { .. } => false,

            Self::StepFailed { source, .. } => source.is_recoverable(),

            _ => true,
        }
    }
}

/// Errors returned by a capability invocation
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Unsupported chart kind: {0}")]
    UnsupportedChartKind(String),

    #[error("Invalid columns: {}", .0.join(", "))]
    InvalidColumns(Vec<String>),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing input: context slot '{0}' is empty")]
    MissingInput(ContextSlot),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl EnsembleErrorExt for CapabilityError {
    fn user_hint(&self) -> &str {
        match self {
            Self::NotFound(_) => "No data table was found at the given location",
            Self::TransportError(_) => "Fetching data failed. Check the URL and your connection",
            Self::QueryError(_) => "The question could not be answered from the data",
            Self::UnsupportedChartKind(_) => "Use a scatter, line, or bar chart",
            Self::InvalidColumns(_) => "The chart refers to columns the data does not have",
            Self::MissingParameter(_) | Self::InvalidParameter(_) => {
                "The plan gave a worker incomplete instructions"
            }
            Self::MissingInput(_) => "A worker ran without the data it needs",
            Self::Generation(_) => "LLM provider unavailable. Check your API key and network",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::MissingInput(_) => false,
            _ => true,
        }
    }
}
