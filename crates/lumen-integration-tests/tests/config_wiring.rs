//! Runners built from TOML configuration files.

mod common;

use std::sync::Arc;

use common::RunnerHarness;
use lumen_config::Config;
use lumen_core::RunStatus;
use lumen_runtime::{DetectionMode, RunRequest, RuntimeError};
use lumen_test::{MockLlmTurn, ScriptedSkill};
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> Config {
    let sessions = dir.path().join("sessions");
    let toml = format!(
        "{body}\n[sessions]\ndirectory = {:?}\n",
        sessions.display().to_string()
    );
    let path = dir.path().join("config.toml");
    std::fs::write(&path, toml).unwrap();
    Config::load_file(&path).unwrap()
}

#[tokio::test]
async fn test_text_mode_and_persona_from_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
[runtime]
detection_mode = "text"
system_prompt = "Base prompt."

[spotlight]
enabled = false

[personas.terse]
system_prompt = "Answer in one word."
max_iterations = 1
"#,
    );
    let clock = Arc::new(ScriptedSkill::returning("get_time", "noon"));
    let h = RunnerHarness::with_config(
        config,
        vec![MockLlmTurn::text(
            "<tool_call>{\"tool\": \"get_time\", \"args\": {}}</tool_call>",
        )],
        &[Arc::clone(&clock)],
    )
    .await;
    assert_eq!(h.runner.config().detection_mode, DetectionMode::Text);

    let result = h
        .runner
        .run(RunRequest::new("what time is it", "s").with_persona("terse"))
        .await
        .unwrap();
    assert_eq!(result.status, RunStatus::Success);
    assert!(result.truncated);
    assert_eq!(result.iterations, 1);
    assert_eq!(clock.call_count(), 1);

    let request = h.provider.last_request().unwrap();
    assert!(request.system.starts_with("Answer in one word."));
    assert!(request.system.contains("## Tool Use Protocol"));
    assert!(!request.system.contains("Base prompt."));
    assert!(!request.system.contains("# Untrusted content"));
    assert!(request.tools.is_empty());
}

#[tokio::test]
async fn test_persona_must_exist() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");
    let h = RunnerHarness::with_config(config, vec![MockLlmTurn::text("hi")], &[]).await;

    let err = h
        .runner
        .run(RunRequest::new("hello", "s").with_persona("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownPersona(_)));
    assert!(h.sink.events().is_empty());
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn test_output_limits_from_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r"
[runtime]
max_output_tokens = 256
max_tool_output_chars = 40
",
    );
    let dump = Arc::new(ScriptedSkill::returning("get_time", "x".repeat(500)));
    let h = RunnerHarness::with_config(
        config,
        vec![
            MockLlmTurn::tool_call("get_time", serde_json::json!({})),
            MockLlmTurn::text("done"),
        ],
        &[dump],
    )
    .await;

    h.run("dump", "s").await;
    let request = h.provider.last_request().unwrap();
    assert_eq!(request.max_tokens, 256);
    let content = &request
        .messages
        .last()
        .unwrap()
        .tool_call_result()
        .unwrap()
        .content;
    assert!(content.len() < 500);
    assert!(content.starts_with(&"x".repeat(40)));
}
