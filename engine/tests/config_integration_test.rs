//! Integration tests for configuration management
//!
//! These tests verify that a Config can be loaded from disk, that omitted
//! sections fall back to defaults, and that invalid values are rejected.

use std::io::Write;
use tempfile::NamedTempFile;

use ensemble_engine::config::Config;
use sdk::errors::EngineError;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
[core]
log_level = "debug"

[llm]
default_provider = "ollama"

[llm.ollama]
base_url = "http://gpu-box:11434"
model = "qwen2.5:14b"

[llm.openai]
model = "gpt-4o"
api_key_env = "MY_OPENAI_KEY"

[orchestrator]
request_timeout_secs = 60

[workers.retrieval]
timeout_secs = 5
user_agent = "test-agent/1.0"

[workers.analysis]
table_name = "films"

[workers.visualization]
width = 1024
height = 768
"#,
    );

    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "ollama");
    assert_eq!(config.llm.ollama.base_url, "http://gpu-box:11434");
    assert_eq!(config.llm.ollama.model, "qwen2.5:14b");
    assert_eq!(config.llm.openai.model, "gpt-4o");
    assert_eq!(config.llm.openai.api_key_env, "MY_OPENAI_KEY");
    assert_eq!(config.llm.openai.base_url, "https://api.openai.com/v1");
    assert_eq!(config.orchestrator.request_timeout_secs, 60);
    assert_eq!(config.workers.retrieval.timeout_secs, 5);
    assert_eq!(config.workers.retrieval.user_agent, "test-agent/1.0");
    assert_eq!(config.workers.analysis.table_name, "films");
    assert_eq!(config.workers.visualization.width, 1024);
    assert_eq!(config.workers.visualization.height, 768);
}

#[test]
fn test_minimal_config_uses_defaults() {
    let file = write_config("[llm]\ndefault_provider = \"openai\"\n");

    let config = Config::load_from_path(file.path()).unwrap();
    let defaults = Config::default_config();

    assert_eq!(config.core.log_level, defaults.core.log_level);
    assert_eq!(
        config.orchestrator.request_timeout_secs,
        defaults.orchestrator.request_timeout_secs
    );
    assert_eq!(config.workers.analysis.table_name, "data_table");
    assert_eq!(config.workers.visualization.width, 800);
    assert_eq!(config.workers.visualization.height, 600);
}

#[test]
fn test_invalid_values_rejected() {
    let cases = [
        "[core]\nlog_level = \"verbose\"\n[llm]\ndefault_provider = \"openai\"\n",
        "[llm]\ndefault_provider = \"anthropic\"\n",
        "[llm]\ndefault_provider = \"openai\"\n[workers.retrieval]\ntimeout_secs = 0\n",
        "[llm]\ndefault_provider = \"openai\"\n[workers.visualization]\nwidth = 0\n",
        "[llm]\ndefault_provider = \"openai\"\n[workers.analysis]\ntable_name = \" \"\n",
    ];

    for contents in cases {
        let file = write_config(contents);
        let result = Config::load_from_path(file.path());
        assert!(
            matches!(result, Err(EngineError::Config(_))),
            "accepted invalid config:\n{}",
            contents
        );
    }
}

#[test]
fn test_malformed_toml() {
    let file = write_config("[llm\ndefault_provider = ");
    match Config::load_from_path(file.path()) {
        Err(EngineError::Config(msg)) => assert!(msg.contains("Failed to parse config")),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load_from_path(&dir.path().join("absent.toml"));
    match result {
        Err(EngineError::Config(msg)) => assert!(msg.contains("Failed to read config file")),
        other => panic!("expected Config error, got {:?}", other),
    }
}
