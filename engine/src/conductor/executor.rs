//! Plan Executor
//!
//! Runs a compiled plan step by step against the capability registry. Each
//! step is resolved, its context preconditions are checked, the worker is
//! invoked, and its output is written to the shared context and/or handed to
//! the result collector. The first failure aborts the whole plan.

use crate::conductor::collector::ResultCollector;
use crate::conductor::context::SharedContext;
use crate::conductor::registry::CapabilityRegistry;
use crate::conductor::types::{ExecutionResult, ExecutionState, TaskPlan, TaskStep};
use sdk::errors::EngineError;
use sdk::{Artifact, Invocation};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Executes plans against a shared, read-only registry
///
/// Cheap to clone. Holds no per-request state: every call works on the
/// `SharedContext` it is given.
#[derive(Debug, Clone)]
pub struct PlanExecutor {
    registry: Arc<CapabilityRegistry>,
}

impl PlanExecutor {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Execute every step of the plan in order
    ///
    /// Returns the caller-visible outputs, or the first error annotated with
    /// the failing step's index and agent. No partial result is returned.
    pub async fn execute(
        &self,
        plan: &TaskPlan,
        context: &mut SharedContext,
    ) -> Result<ExecutionResult, EngineError> {
        let mut state = ExecutionState::Pending;
        self.execute_tracked(plan, context, &mut state).await
    }

    /// Like `execute`, recording progress in `state`
    ///
    /// `state` moves `Pending -> Running{0} -> ... -> Completed`, or ends in
    /// `Aborted` at the first failing step.
    pub async fn execute_tracked(
        &self,
        plan: &TaskPlan,
        context: &mut SharedContext,
        state: &mut ExecutionState,
    ) -> Result<ExecutionResult, EngineError> {
        *state = ExecutionState::Pending;
        let start = Instant::now();
        let mut collector = ResultCollector::new();

        info!("Executing plan {} ({} steps)", plan.id(), plan.len());

        for (index, step) in plan.steps().iter().enumerate() {
            *state = ExecutionState::Running { step: index };

            match self.run_step(index, step, context).await {
                Ok(Some(output)) => collector.push(output),
                Ok(None) => {}
                Err(e) => {
                    warn!("Plan {} aborted at step {}: {}", plan.id(), index, e);
                    *state = ExecutionState::Aborted {
                        step: index,
                        agent: step.agent.clone(),
                        reason: e.to_string(),
                    };
                    return Err(e);
                }
            }
        }

        *state = ExecutionState::Completed;
        info!(
            "Plan {} completed in {:.1}s with {} result(s)",
            plan.id(),
            start.elapsed().as_secs_f64(),
            collector.len()
        );

        Ok(collector.finish())
    }

    /// Run one step. Returns the output when it is caller-visible.
    async fn run_step(
        &self,
        index: usize,
        step: &TaskStep,
        context: &mut SharedContext,
    ) -> Result<Option<Artifact>, EngineError> {
        // The registry may differ from the catalog the plan was compiled against
        let capability =
            self.registry
                .resolve(&step.agent)
                .ok_or_else(|| EngineError::UnknownCapability {
                    step: index,
                    agent: step.agent.clone(),
                })?;
        let descriptor = capability.descriptor();

        if let Some(slot) = context.first_missing(&descriptor.reads) {
            return Err(EngineError::MissingPrecondition {
                step: index,
                agent: step.agent.clone(),
                slot,
            });
        }

        let inputs = descriptor
            .reads
            .iter()
            .filter_map(|slot| context.read(*slot).map(|artifact| (*slot, artifact)))
            .collect();
        let invocation = Invocation::new(&step.goal, &step.parameters, inputs);

        info!("Step {}: delegating to '{}'", index, step.agent);
        debug!("  goal: {}", step.goal);
        let start = Instant::now();

        let output = capability
            .invoke(invocation)
            .await
            .map_err(|source| EngineError::StepFailed {
                step: index,
                agent: step.agent.clone(),
                source,
            })?;

        debug!(
            "Step {} returned a {} artifact in {:.1}s",
            index,
            output.kind(),
            start.elapsed().as_secs_f64()
        );

        let write = |context: &mut SharedContext, slot, artifact| {
            context
                .write(slot, artifact)
                .map_err(|mismatch| EngineError::SlotTypeMismatch {
                    step: index,
                    agent: step.agent.clone(),
                    slot: mismatch.slot,
                    found: mismatch.found,
                })
        };

        match (descriptor.writes, descriptor.caller_visible) {
            (Some(slot), true) => {
                write(context, slot, output.clone())?;
                Ok(Some(output))
            }
            (Some(slot), false) => {
                write(context, slot, output)?;
                Ok(None)
            }
            (None, visible) => Ok(visible.then_some(output)),
        }
    }
}
