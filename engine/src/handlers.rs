//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Compile and execute a task
//! - plan: Compile a task and show the plan
//! - capabilities: List the registered workers

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::conductor::{Orchestrator, TaskPlan};
use crate::config::Config;
use crate::llm::build_provider;
use crate::workers::default_registry;
use sdk::errors::EnsembleErrorExt;
use sdk::Artifact;

/// Longest data URI printed in text mode
const MAX_TEXT_URI: usize = 64;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Wire the configured provider and the default workers into an orchestrator
pub fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let llm = build_provider(&config.llm).context("Failed to create LLM provider")?;
    let registry = default_registry(Arc::clone(&llm), &config.workers)
        .context("Failed to register workers")?;

    Ok(Orchestrator::new(llm, Arc::new(registry)).with_request_timeout(
        Duration::from_secs(config.orchestrator.request_timeout_secs),
    ))
}

/// Compile and execute a task
pub async fn handle_run(task: String, config: &Config, format: OutputFormat) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    if let OutputFormat::Text = format {
        println!("Executing task: {}", task);
        println!();
    }

    match orchestrator.handle_request(&task).await {
        Ok(result) => {
            match format {
                OutputFormat::Text => {
                    if result.is_empty() {
                        println!("(no results)");
                    }
                    for (i, artifact) in result.iter().enumerate() {
                        println!("[{}] {}", i + 1, render_artifact(artifact));
                    }
                    println!();
                    println!("✓ Task completed successfully");
                }
                OutputFormat::Json => {
                    let output = json!({
                        "status": "completed",
                        "results": result,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            Ok(())
        }
        Err(e) => {
            match format {
                OutputFormat::Text => {
                    println!("✗ Task failed: {}", e);
                    println!("  Hint: {}", e.user_hint());
                }
                OutputFormat::Json => {
                    let output = json!({
                        "status": "failed",
                        "error": e.to_string(),
                        "step": e.step_index(),
                        "hint": e.user_hint(),
                        "recoverable": e.is_recoverable(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            Err(e.into())
        }
    }
}

/// Compile a task and print the plan
pub async fn handle_plan(task: String, config: &Config, format: OutputFormat) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let plan = orchestrator
        .compile(&task)
        .await
        .context("Failed to compile plan")?;

    match format {
        OutputFormat::Text => print!("{}", render_plan(&plan)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }

    Ok(())
}

/// List the registered capabilities
pub async fn handle_capabilities(config: &Config, format: OutputFormat) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let catalog = orchestrator.catalog();

    match format {
        OutputFormat::Text => {
            println!("Capabilities:");
            println!();
            for d in catalog.descriptors() {
                println!("  {}", d.name);
                println!("    {}", d.summary);
                if !d.required_params.is_empty() {
                    println!("    Requires: {}", d.required_params.join(", "));
                }
                if !d.reads.is_empty() {
                    let reads: Vec<&str> = d.reads.iter().map(|s| s.as_str()).collect();
                    println!("    Reads:    {}", reads.join(", "));
                }
                if let Some(slot) = d.writes {
                    println!("    Writes:   {}", slot);
                }
                println!(
                    "    Output:   {}",
                    if d.caller_visible { "returned" } else { "internal" }
                );
                println!();
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "capabilities": catalog.descriptors(),
                "count": catalog.descriptors().len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// One-line rendering of a result for the terminal
pub fn render_artifact(artifact: &Artifact) -> String {
    match artifact {
        Artifact::Image { mime_type, data_uri } => {
            let preview: String = data_uri.chars().take(MAX_TEXT_URI).collect();
            format!("{} image ({} bytes): {}...", mime_type, data_uri.len(), preview)
        }
        Artifact::Dataset(ds) => format!(
            "dataset with {} rows x {} columns ({})",
            ds.num_rows(),
            ds.num_columns(),
            ds.columns().join(", ")
        ),
        Artifact::Empty => "(no answer)".to_string(),
        other => other.to_json().to_string(),
    }
}

fn render_plan(plan: &TaskPlan) -> String {
    let mut out = format!("Plan {} ({} steps)\n\n", plan.id(), plan.len());
    for (i, step) in plan.steps().iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i, step.agent));
        if !step.goal.is_empty() {
            out.push_str(&format!("   Goal: {}\n", step.goal));
        }
        for (key, value) in step.parameters.iter() {
            out.push_str(&format!("   {}: {}\n", key, value));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::TaskStep;
    use sdk::{CellValue, Dataset};

    #[test]
    fn test_render_artifact() {
        assert_eq!(render_artifact(&Artifact::Value(CellValue::Integer(2))), "2");
        assert_eq!(render_artifact(&Artifact::Empty), "(no answer)");

        let record = Artifact::Record(vec![("Title".to_string(), CellValue::Text("Avatar".to_string()))]);
        assert_eq!(render_artifact(&record), r#"{"Title":"Avatar"}"#);

        let image = Artifact::Image {
            mime_type: "image/svg+xml".to_string(),
            data_uri: format!("data:image/svg+xml;base64,{}", "A".repeat(500)),
        };
        let text = render_artifact(&image);
        assert!(text.starts_with("image/svg+xml image (526 bytes)"));
        assert!(text.len() < 200);

        let ds = Artifact::Dataset(Dataset::new(vec!["Year".to_string()]));
        assert_eq!(render_artifact(&ds), "dataset with 0 rows x 1 columns (Year)");
    }

    #[test]
    fn test_render_plan() {
        let plan = TaskPlan::new(
            "count",
            vec![
                TaskStep::new("SearchAndScrapeAgent", "Fetch")
                    .with_param("url", json!("https://example.com")),
                TaskStep::new("DataAnalysisAgent", "How many?"),
            ],
        );
        let text = render_plan(&plan);
        assert!(text.contains("0. SearchAndScrapeAgent"));
        assert!(text.contains("   url: \"https://example.com\""));
        assert!(text.contains("1. DataAnalysisAgent"));
    }

    #[test]
    fn test_build_orchestrator_from_defaults() {
        let mut config = Config::default_config();
        config.llm.default_provider = "ollama".to_string();

        let orchestrator = build_orchestrator(&config).unwrap();
        assert_eq!(orchestrator.catalog().descriptors().len(), 3);
    }
}
