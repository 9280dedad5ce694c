//! Orchestrator
//!
//! Single entry point for a request: compile the task text into a plan, run
//! it against a fresh `SharedContext`, return the caller-visible outputs.
//!
//! # Limits
//!
//! - Optional deadline on the whole request (compile + execute). When it
//!   expires the in-flight step is dropped and `RequestTimeout` is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info};

use crate::conductor::compiler::PlanCompiler;
use crate::conductor::context::SharedContext;
use crate::conductor::executor::PlanExecutor;
use crate::conductor::registry::{CapabilityRegistry, Catalog};
use crate::conductor::types::{ExecutionResult, TaskPlan};
use crate::llm::LLMProvider;
use sdk::errors::EngineError;

pub struct Orchestrator {
    compiler: PlanCompiler,
    executor: PlanExecutor,
    request_timeout: Option<Duration>,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators
    ///
    /// The provider is used for plan generation only; workers that need an
    /// LLM are handed their own reference when the registry is built.
    pub fn new(llm: Arc<dyn LLMProvider>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            compiler: PlanCompiler::new(llm),
            executor: PlanExecutor::new(registry),
            request_timeout: None,
        }
    }

    /// Bound the duration of `handle_request`. A zero duration disables the bound.
    pub fn with_request_timeout(mut self, limit: Duration) -> Self {
        self.request_timeout = (!limit.is_zero()).then_some(limit);
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        self.executor.registry()
    }

    pub fn catalog(&self) -> Catalog {
        self.registry().catalog()
    }

    /// Compile a request without running it
    pub async fn compile(&self, task: &str) -> Result<TaskPlan, EngineError> {
        self.compiler.compile(task, &self.catalog()).await
    }

    /// Run an already compiled plan in a fresh context
    pub async fn execute(&self, plan: &TaskPlan) -> Result<ExecutionResult, EngineError> {
        let mut context = SharedContext::new();
        self.executor.execute(plan, &mut context).await
    }

    /// Handle one request end to end
    pub async fn handle_request(&self, task: &str) -> Result<ExecutionResult, EngineError> {
        let start = Instant::now();
        let work = async {
            let plan = self.compile(task).await?;
            self.execute(&plan).await
        };

        let result = match self.request_timeout {
            Some(limit) => match timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => {
                    error!("Request timed out after {}s", limit.as_secs());
                    return Err(EngineError::RequestTimeout(limit.as_secs()));
                }
            },
            None => work.await,
        };

        match &result {
            Ok(outputs) => info!(
                "Request handled in {:.1}s ({} result(s))",
                start.elapsed().as_secs_f64(),
                outputs.len()
            ),
            Err(e) => error!("Request failed: {}", e),
        }

        result
    }
}
