//! Conductor Types
//!
//! Plans, steps, and the outcome of running a plan.

use sdk::{Artifact, StepParams};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::time::{SystemTime, UNIX_EPOCH};

/// A compiled, validated, ordered plan
///
/// Step order is execution order. Once built the plan cannot be modified.
#[derive(Debug, Clone, Serialize)]
pub struct TaskPlan {
    id: String,
    request: String,
    steps: Vec<TaskStep>,
    created_at: i64,
}

impl TaskPlan {
    pub fn new(request: impl Into<String>, steps: Vec<TaskStep>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request: request.into(),
            steps,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The request text the plan was compiled from
    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn steps(&self) -> &[TaskStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Unix timestamp (seconds)
    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// One delegated operation in a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStep {
    pub agent: String,
    pub goal: String,
    pub parameters: StepParams,
}

impl TaskStep {
    pub fn new(agent: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            goal: goal.into(),
            parameters: StepParams::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key, value);
        self
    }
}

/// Caller-visible outputs of a plan, in plan order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult(Vec<Artifact>);

impl ExecutionResult {
    pub fn new(outputs: Vec<Artifact>) -> Self {
        Self(outputs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Artifact> {
        self.0
    }

    /// JSON array of the plain renderings of each output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.0.iter().map(Artifact::to_json).collect())
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for artifact in &self.0 {
            seq.serialize_element(&artifact.to_json())?;
        }
        seq.end()
    }
}

impl IntoIterator for ExecutionResult {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Where a plan run currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionState {
    Pending,
    Running { step: usize },
    Completed,
    Aborted {
        step: usize,
        agent: String,
        reason: String,
    },
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted { .. })
    }
}
