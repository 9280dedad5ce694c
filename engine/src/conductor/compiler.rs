//! Plan Compiler
//!
//! Turns a free-text request into a validated `TaskPlan` by asking the LLM for
//! a JSON plan and checking every step against the capability catalog. The
//! LLM output is untrusted: anything that does not parse, names an unknown
//! capability, or lacks a required field is rejected with a typed error.

use crate::conductor::registry::Catalog;
use crate::conductor::types::{TaskPlan, TaskStep};
use crate::llm::{extract_balanced_json, extract_fenced_block, LLMProvider, Message, ResponseFormat};
use sdk::errors::EngineError;
use sdk::StepParams;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PlanCompiler {
    llm: Arc<dyn LLMProvider>,
}

impl PlanCompiler {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }

    /// Compile a request into a plan the executor can run.
    ///
    /// Performs no execution; the only side effect is the LLM call.
    pub async fn compile(&self, request: &str, catalog: &Catalog) -> Result<TaskPlan, EngineError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(EngineError::InvalidRequest(
                "task text is empty".to_string(),
            ));
        }

        let messages = [
            Message::system(system_prompt(catalog)),
            Message::user(request),
        ];

        info!("Generating plan with {} provider", self.llm.name());
        let content = self.llm.generate(&messages, ResponseFormat::Json).await?;
        debug!("Planner returned {} chars", content.len());

        let steps = parse_plan(&content, catalog)?;
        let plan = TaskPlan::new(request, steps);

        info!("Compiled plan {} with {} step(s)", plan.id(), plan.len());
        for (i, step) in plan.steps().iter().enumerate() {
            debug!("  step {}: {} - {}", i, step.agent, step.goal);
        }

        Ok(plan)
    }
}

/// Build the planner instructions for a catalog
pub fn system_prompt(catalog: &Catalog) -> String {
    let mut prompt = String::from(
        "You are a master orchestrator agent. Your job is to create a step-by-step plan to \
         fulfill a user's request by delegating tasks to specialized worker agents.\n\n\
         You have access to the following agents:\n",
    );
    prompt.push_str(&catalog.describe());
    prompt.push_str(
        "\n\nBased on the user's prompt, create a JSON plan that outlines the sequence of agent calls.\n\
         - Extract any URL a step needs directly from the prompt.\n\
         - Give every step a clear, self-contained goal.\n\
         - Put capability-specific settings (plot type, columns, styling) in a \"params\" object.\n\
         - Order steps so that data is produced before it is used.\n\n\
         Generate ONLY the JSON plan. Do not add any conversational text.\n",
    );

    let examples: Vec<Value> = catalog
        .descriptors()
        .iter()
        .filter_map(|d| d.example.clone())
        .collect();
    if !examples.is_empty() {
        let example = json!({ "tasks": examples });
        let rendered = serde_json::to_string_pretty(&example).unwrap_or_default();
        prompt.push_str("\nExample Plan Structure:\n");
        prompt.push_str(&rendered);
        prompt.push('\n');
    }

    prompt
}

/// Parse and validate planner output against a catalog.
///
/// Accepts `{"tasks": [...]}` or a bare array, optionally wrapped in a code
/// fence or surrounded by prose.
pub fn parse_plan(content: &str, catalog: &Catalog) -> Result<Vec<TaskStep>, EngineError> {
    let value = parse_json_loosely(content).ok_or_else(|| {
        warn!("Planner output is not JSON");
        EngineError::MalformedPlan(format!(
            "could not parse planner output as JSON: {}",
            preview(content)
        ))
    })?;

    let raw_steps = match value {
        Value::Array(steps) => steps,
        Value::Object(mut obj) => match obj.remove("tasks") {
            Some(Value::Array(steps)) => steps,
            Some(_) => {
                return Err(EngineError::MalformedPlan(
                    "'tasks' is not an array".to_string(),
                ))
            }
            None => {
                return Err(EngineError::MalformedPlan(
                    "expected a 'tasks' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(EngineError::MalformedPlan(
                "expected a JSON object or array".to_string(),
            ))
        }
    };

    raw_steps
        .into_iter()
        .enumerate()
        .map(|(i, raw)| validate_step(i, raw, catalog))
        .collect()
}

fn parse_json_loosely(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(block) = extract_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(block.trim()) {
            return Some(value);
        }
    }
    // Prose may hold bracketed text ahead of the plan, so try each opening bracket
    trimmed
        .match_indices(['{', '['])
        .filter_map(|(start, _)| extract_balanced_json(&trimmed[start..]))
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .find(is_plan_shaped)
}

fn is_plan_shaped(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().all(Value::is_object),
        _ => false,
    }
}

fn validate_step(index: usize, raw: Value, catalog: &Catalog) -> Result<TaskStep, EngineError> {
    let Value::Object(mut fields) = raw else {
        return Err(EngineError::MalformedPlan(format!(
            "step {} is not a JSON object",
            index
        )));
    };

    let agent = match fields.remove("agent") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            return Err(EngineError::SchemaViolation {
                step: index,
                agent: String::new(),
                field: "agent".to_string(),
            })
        }
    };

    let descriptor = catalog
        .get(&agent)
        .ok_or_else(|| EngineError::UnknownCapability {
            step: index,
            agent: agent.clone(),
        })?;

    let goal = match fields.remove("goal") {
        Some(Value::String(goal)) => goal,
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };
    if descriptor.requires_goal && goal.trim().is_empty() {
        return Err(EngineError::SchemaViolation {
            step: index,
            agent,
            field: "goal".to_string(),
        });
    }

    let nested = match fields.remove("params") {
        None | Some(Value::Null) => serde_json::Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(EngineError::SchemaViolation {
                step: index,
                agent,
                field: "params".to_string(),
            })
        }
    };

    // `agent`, `goal` and `params` were removed above; the rest are parameters
    let mut parameters: StepParams = fields.into_iter().collect();
    for (key, value) in nested {
        parameters.insert(key, value);
    }

    if let Some(missing) = descriptor
        .required_params
        .iter()
        .find(|key| !parameters.is_present(key))
    {
        return Err(EngineError::SchemaViolation {
            step: index,
            agent,
            field: missing.clone(),
        });
    }

    Ok(TaskStep {
        agent,
        goal,
        parameters,
    })
}

fn preview(content: &str) -> String {
    const MAX: usize = 120;
    let trimmed = content.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
