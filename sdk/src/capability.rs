//! Capability trait and descriptor types
//!
//! A capability is a named worker operation the engine can delegate a plan
//! step to. Its `CapabilityDescriptor` declares the contract the engine
//! enforces around the call: required parameters, the context slots it reads,
//! the slot it writes, and whether its output goes back to the caller.

use crate::artifact::{Artifact, ContextSlot};
use crate::dataset::Dataset;
use crate::errors::CapabilityError;
use crate::types::StepParams;
use async_trait::async_trait;
use serde::Serialize;

/// Trait that all worker capabilities must implement
#[async_trait]
pub trait Capability: Send + Sync {
    /// Static contract of this capability
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Returns the name of the capability
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Perform the operation for one plan step
    async fn invoke(&self, invocation: Invocation<'_>) -> Result<Artifact, CapabilityError>;
}

/// Declared contract of a capability
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityDescriptor {
    /// Identifier used in plans (e.g. `SearchAndScrapeAgent`)
    pub name: String,

    /// One-line description shown to the planner
    pub summary: String,

    /// Parameters every step for this capability must carry
    pub required_params: Vec<String>,

    /// Whether the step's goal text is the capability's primary input
    pub requires_goal: bool,

    /// Context slots that must be populated before invocation
    pub reads: Vec<ContextSlot>,

    /// Context slot overwritten with the output, if any
    pub writes: Option<ContextSlot>,

    /// Whether the output is appended to the caller's result
    pub caller_visible: bool,

    /// Example step shown to the planner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

impl CapabilityDescriptor {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            required_params: Vec::new(),
            requires_goal: false,
            reads: Vec::new(),
            writes: None,
            caller_visible: false,
            example: None,
        }
    }

    pub fn requires_param(mut self, key: impl Into<String>) -> Self {
        self.required_params.push(key.into());
        self
    }

    pub fn requires_goal(mut self) -> Self {
        self.requires_goal = true;
        self
    }

    pub fn reads(mut self, slot: ContextSlot) -> Self {
        if !self.reads.contains(&slot) {
            self.reads.push(slot);
        }
        self
    }

    pub fn writes(mut self, slot: ContextSlot) -> Self {
        self.writes = Some(slot);
        self
    }

    pub fn caller_visible(mut self) -> Self {
        self.caller_visible = true;
        self
    }

    pub fn example(mut self, step: serde_json::Value) -> Self {
        self.example = Some(step);
        self
    }
}

/// Everything a capability receives for one step
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    goal: &'a str,
    params: &'a StepParams,
    inputs: Vec<(ContextSlot, &'a Artifact)>,
}

impl<'a> Invocation<'a> {
    pub fn new(
        goal: &'a str,
        params: &'a StepParams,
        inputs: Vec<(ContextSlot, &'a Artifact)>,
    ) -> Self {
        Self {
            goal,
            params,
            inputs,
        }
    }

    pub fn goal(&self) -> &'a str {
        self.goal
    }

    pub fn params(&self) -> &'a StepParams {
        self.params
    }

    /// Value of a context slot the capability declared it reads
    pub fn input(&self, slot: ContextSlot) -> Option<&'a Artifact> {
        self.inputs
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, artifact)| *artifact)
    }

    /// Dataset held in a context slot
    pub fn dataset(&self, slot: ContextSlot) -> Result<&'a Dataset, CapabilityError> {
        self.input(slot)
            .and_then(Artifact::as_dataset)
            .ok_or(CapabilityError::MissingInput(slot))
    }
}
