//! Shared test doubles for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ensemble_engine::conductor::CapabilityRegistry;
use ensemble_engine::llm::{LLMError, LLMProvider, Message, ResponseFormat};
use sdk::errors::CapabilityError;
use sdk::{
    Artifact, Capability, CapabilityDescriptor, CellValue, ContextSlot, Dataset, Invocation,
};

/// LLM that replays canned completions in order
pub struct ScriptedLLM {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLLM {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Messages of the n-th call
    pub fn prompt(&self, n: usize) -> Vec<Message> {
        self.prompts.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLLM {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        messages: &[Message],
        _format: ResponseFormat,
    ) -> Result<String, LLMError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LLMError::InvalidRequest("no scripted reply left".to_string()))
    }
}

/// What a probe does when invoked
pub enum Behavior {
    /// Build a one-column `Year` dataset from the `years` parameter,
    /// optionally sleeping `delay_ms` first
    LoadYears,
    /// Count dataset rows where `Year` is below the number ending the goal
    CountYearsBelow,
    /// Return the first `Year` of the dataset
    FirstYear,
    /// Return the goal text
    EchoGoal,
    /// Fail with a transport error
    Fail,
}

/// Instrumented capability counting its invocations
pub struct Probe {
    descriptor: CapabilityDescriptor,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl Probe {
    pub fn new(descriptor: CapabilityDescriptor, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn loader(name: &str) -> Arc<Self> {
        Self::new(
            CapabilityDescriptor::new(name, "loads years")
                .requires_param("years")
                .writes(ContextSlot::Dataset),
            Behavior::LoadYears,
        )
    }

    pub fn counter(name: &str) -> Arc<Self> {
        Self::new(
            CapabilityDescriptor::new(name, "counts rows")
                .requires_goal()
                .reads(ContextSlot::Dataset)
                .writes(ContextSlot::Answer)
                .caller_visible(),
            Behavior::CountYearsBelow,
        )
    }

    pub fn first_year(name: &str) -> Arc<Self> {
        Self::new(
            CapabilityDescriptor::new(name, "first year")
                .reads(ContextSlot::Dataset)
                .caller_visible(),
            Behavior::FirstYear,
        )
    }

    pub fn echo(name: &str) -> Arc<Self> {
        Self::new(
            CapabilityDescriptor::new(name, "echoes").caller_visible(),
            Behavior::EchoGoal,
        )
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Self::new(CapabilityDescriptor::new(name, "fails"), Behavior::Fail)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for Probe {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, invocation: Invocation<'_>) -> Result<Artifact, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::LoadYears => {
                if let Some(delay) = invocation.params().get("delay_ms").and_then(|v| v.as_u64()) {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                let years = invocation
                    .params()
                    .param_json("years")?
                    .as_array()
                    .ok_or_else(|| CapabilityError::InvalidParameter("years".to_string()))?
                    .iter()
                    .map(|y| vec![y.as_i64().map(CellValue::Integer).unwrap_or(CellValue::Null)])
                    .collect();
                Dataset::from_rows(vec!["Year".to_string()], years)
                    .map(Artifact::Dataset)
                    .map_err(|e| CapabilityError::InvalidParameter(e.to_string()))
            }
            Behavior::CountYearsBelow => {
                let dataset = invocation.dataset(ContextSlot::Dataset)?;
                let limit: f64 = invocation
                    .goal()
                    .split_whitespace()
                    .last()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| CapabilityError::InvalidParameter("goal".to_string()))?;
                let count = dataset
                    .column_values("Year")
                    .ok_or_else(|| CapabilityError::InvalidColumns(vec!["Year".to_string()]))?
                    .filter(|v| v.as_f64().is_some_and(|y| y < limit))
                    .count();
                Ok(Artifact::Value(CellValue::Integer(count as i64)))
            }
            Behavior::FirstYear => {
                let dataset = invocation.dataset(ContextSlot::Dataset)?;
                let first = dataset
                    .column_values("Year")
                    .and_then(|mut values| values.next().cloned())
                    .unwrap_or(CellValue::Null);
                Ok(Artifact::Value(first))
            }
            Behavior::EchoGoal => Ok(Artifact::Value(CellValue::Text(
                invocation.goal().to_string(),
            ))),
            Behavior::Fail => Err(CapabilityError::TransportError(
                "connection reset".to_string(),
            )),
        }
    }
}

/// Registry over the given probes, in order
pub fn registry_of(probes: &[&Arc<Probe>]) -> Arc<CapabilityRegistry> {
    let mut builder = CapabilityRegistry::builder();
    for probe in probes {
        builder = builder
            .register(Arc::clone(*probe) as Arc<dyn Capability>)
            .unwrap();
    }
    Arc::new(builder.build())
}
