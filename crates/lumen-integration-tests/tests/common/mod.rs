//! Shared test harness for integration tests.

use std::path::Path;
use std::sync::Arc;

use lumen_approval::ConfirmationResponse;
use lumen_config::Config;
use lumen_core::ConfirmationId;
use lumen_llm::ProviderRegistry;
use lumen_runtime::{AgentRunner, RunRequest, RunResult};
use lumen_test::{MockLlmProvider, MockLlmTurn, RecordingSink, ScriptedSkill};
use lumen_tools::SkillRegistry;
use tempfile::TempDir;

/// A runner wired the way a deployment would be: JSON session files and a
/// JSON authorization file, both inside a temp directory.
#[allow(dead_code)]
pub struct RunnerHarness {
    /// The runner under test.
    pub runner: Arc<AgentRunner>,
    /// The scripted provider.
    pub provider: Arc<MockLlmProvider>,
    /// Captured lifecycle events.
    pub sink: Arc<RecordingSink>,
    /// The configuration the runner was built from.
    pub config: Arc<Config>,
}

/// Configuration rooted at `dir`.
#[allow(dead_code)]
pub fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.runtime.system_prompt = "You are a test assistant.".to_string();
    config.runtime.workspace_root = Some(dir.display().to_string());
    config.sessions.directory = Some(dir.join("sessions").display().to_string());
    config.approval.authorizations_file =
        Some(dir.join("authorizations.json").display().to_string());
    config
}

#[allow(dead_code)]
impl RunnerHarness {
    /// Build a harness in `dir` with default configuration.
    pub async fn new(dir: &TempDir, turns: Vec<MockLlmTurn>, skills: &[Arc<ScriptedSkill>]) -> Self {
        Self::with_config(config_in(dir.path()), turns, skills).await
    }

    /// Build a harness from explicit configuration.
    pub async fn with_config(
        config: Config,
        turns: Vec<MockLlmTurn>,
        skills: &[Arc<ScriptedSkill>],
    ) -> Self {
        let provider = Arc::new(MockLlmProvider::new(turns));
        let sink = RecordingSink::new();
        let config = Arc::new(config);

        let mut registry = SkillRegistry::new();
        for skill in skills {
            registry.register(Arc::clone(skill) as Arc<dyn lumen_tools::Skill>);
        }

        let runner = AgentRunner::from_config(
            ProviderRegistry::single(Arc::clone(&provider) as Arc<dyn lumen_llm::LlmProvider>),
            registry,
            Arc::clone(&sink) as Arc<dyn lumen_events::EventSink>,
            Arc::clone(&config),
        )
        .await
        .expect("failed to build runner");

        Self {
            runner: Arc::new(runner),
            provider,
            sink,
            config,
        }
    }

    /// Run a message that needs no confirmation.
    pub async fn run(&self, message: &str, session: &str) -> RunResult {
        self.runner
            .run(RunRequest::new(message, session))
            .await
            .expect("run rejected")
    }

    /// Spawn a run, wait for its next confirmation, and answer it.
    ///
    /// `before_answer` sees the confirmation ID while the run is suspended.
    pub async fn run_answering(
        &self,
        message: &str,
        session: &str,
        before_answer: impl FnOnce(&ConfirmationId),
        respond: impl FnOnce(ConfirmationId) -> ConfirmationResponse,
    ) -> RunResult {
        let seen = self.sink.confirmation_ids().len();
        let runner = Arc::clone(&self.runner);
        let request = RunRequest::new(message, session);
        let task = tokio::spawn(async move { runner.run(request).await });

        let confirm_id = loop {
            let ids = self.sink.confirmation_ids();
            if let Some(id) = ids.get(seen) {
                break id.clone();
            }
            tokio::task::yield_now().await;
        };
        before_answer(&confirm_id);
        assert!(self.runner.respond(&respond(confirm_id)));

        task.await.expect("run task panicked").expect("run rejected")
    }
}

/// Inline `exec` call wrapped in prose.
#[allow(dead_code)]
pub fn inline_exec(command: &str) -> String {
    format!("I'll run it. {{\"tool\": \"exec\", \"args\": {{\"command\": \"{command}\"}}}} One moment.")
}
