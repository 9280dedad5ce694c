//! CLI interface for Ensemble
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ensemble task orchestrator
///
/// Compiles a free-text task into a plan of worker steps (retrieve a table,
/// analyze it, chart it) and runs the plan.
#[derive(Parser, Debug)]
#[command(name = "ensemble")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and execute a task
    Run {
        /// The task to execute
        task: String,
    },

    /// Compile a task and print the plan without running it
    Plan {
        /// The task to plan
        task: String,
    },

    /// List the registered capabilities
    Capabilities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["ensemble", "run", "count the films"]);
        if let Command::Run { task } = cli.command {
            assert_eq!(task, "count the films");
        } else {
            panic!("Expected Run command");
        }
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "ensemble",
            "plan",
            "chart it",
            "--json",
            "--log",
            "debug",
            "--config",
            "/tmp/ensemble.toml",
        ]);
        assert!(cli.json);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/ensemble.toml")));
        assert!(matches!(cli.command, Command::Plan { .. }));
    }

    #[test]
    fn test_capabilities_command() {
        let cli = Cli::parse_from(["ensemble", "capabilities"]);
        assert!(matches!(cli.command, Command::Capabilities));
    }

    #[test]
    fn test_missing_task_rejected() {
        assert!(Cli::try_parse_from(["ensemble", "run"]).is_err());
    }
}
