//! Agent runner - the orchestration component.
//!
//! Drives a provider through a streaming conversation, detects tool calls,
//! gates and executes them, and feeds the results back until the model
//! answers or the iteration cap is hit.

use lumen_approval::{
    AuthorizationStore, ConfirmationBroker, ConfirmationRequest, ConfirmationResponse,
    FileAuthorizationStore, MemoryAuthorizationStore, RiskClassifier,
};
use lumen_config::Config;
use lumen_core::RunId;
use lumen_events::EventSink;
use lumen_llm::ProviderRegistry;
use lumen_tools::{SkillRegistry, Spotlighter, ToolCallParser};
use std::sync::Arc;
use tracing::info;

use crate::error::RuntimeResult;
use crate::run::{RunHandle, RunTable};
use crate::store::{JsonSessionStore, MemorySessionStore, SessionStore};

mod config;
mod execution;
mod tool_execution;


pub use config::{DetectionMode, Persona, RuntimeConfig};

/// The agent runner.
///
/// One runner owns its skill registry, confirmation broker, and run table.
/// Several runs may be in flight at once, but never two for the same
/// session key.
pub struct AgentRunner {
    /// LLM providers.
    pub(super) providers: ProviderRegistry,
    /// Registered skills.
    pub(super) skills: SkillRegistry,
    /// Session persistence.
    pub(super) sessions: Arc<dyn SessionStore>,
    /// Remembered approvals.
    pub(super) authorizations: Arc<dyn AuthorizationStore>,
    /// Lifecycle event destination.
    pub(super) sink: Arc<dyn EventSink>,
    /// Outstanding confirmations.
    pub(super) broker: ConfirmationBroker,
    /// Tool risk tiers.
    pub(super) classifier: RiskClassifier,
    /// Untrusted output wrapper.
    pub(super) spotlighter: Spotlighter,
    /// Inline tool-call parser.
    pub(super) parser: ToolCallParser,
    /// In-flight runs.
    pub(super) runs: RunTable,
    /// Runner settings.
    pub(super) config: RuntimeConfig,
    /// Configuration handed to skills.
    pub(super) shared_config: Arc<Config>,
}

impl AgentRunner {
    /// Create a runner from loaded configuration.
    ///
    /// Remembered approvals are kept in memory; use
    /// [`with_authorization_store`](Self::with_authorization_store) to persist
    /// them.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not convert to
    /// [`RuntimeConfig`].
    pub fn new(
        providers: ProviderRegistry,
        skills: SkillRegistry,
        sessions: Arc<dyn SessionStore>,
        sink: Arc<dyn EventSink>,
        config: Arc<Config>,
    ) -> RuntimeResult<Self> {
        let runtime = RuntimeConfig::from_config(&config)?;
        Ok(Self::with_runtime_config(
            providers, skills, sessions, sink, config, runtime,
        ))
    }

    /// Create a runner with explicit runner settings.
    #[must_use]
    pub fn with_runtime_config(
        providers: ProviderRegistry,
        skills: SkillRegistry,
        sessions: Arc<dyn SessionStore>,
        sink: Arc<dyn EventSink>,
        shared_config: Arc<Config>,
        config: RuntimeConfig,
    ) -> Self {
        let classifier = config.risk_overrides.iter().fold(
            RiskClassifier::new().with_unknown_default(config.unknown_tool_risk),
            |classifier, (tool, level)| classifier.with_override(tool.clone(), *level),
        );

        info!(
            providers = providers.len(),
            skills = skills.len(),
            detection_mode = %config.detection_mode,
            max_iterations = config.max_iterations,
            confirmation_timeout_secs = config.confirmation_timeout.as_secs(),
            "Agent runner initialized"
        );

        Self {
            providers,
            skills,
            sessions,
            authorizations: Arc::new(MemoryAuthorizationStore::new()),
            sink,
            broker: ConfirmationBroker::with_timeout(config.confirmation_timeout),
            classifier,
            spotlighter: Spotlighter::new().with_salt_bytes(config.spotlight_salt_bytes),
            parser: ToolCallParser::new().with_json_repair(config.json_repair),
            runs: RunTable::new(),
            config,
            shared_config,
        }
    }

    /// Create a runner whose stores follow the `[sessions]` and `[approval]`
    /// sections: JSON files where a location is configured, memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not convert or the
    /// authorization file cannot be opened.
    pub async fn from_config(
        providers: ProviderRegistry,
        skills: SkillRegistry,
        sink: Arc<dyn EventSink>,
        config: Arc<Config>,
    ) -> RuntimeResult<Self> {
        let sessions: Arc<dyn SessionStore> = match config.sessions.directory.as_deref() {
            Some(dir) => Arc::new(JsonSessionStore::new(dir)),
            None => Arc::new(MemorySessionStore::new()),
        };
        let authorizations: Arc<dyn AuthorizationStore> =
            match config.approval.authorizations_file.as_deref() {
                Some(path) => Arc::new(FileAuthorizationStore::open(path).await?),
                None => Arc::new(MemoryAuthorizationStore::new()),
            };

        Ok(Self::new(providers, skills, sessions, sink, config)?
            .with_authorization_store(authorizations))
    }

    /// Use a different authorization store.
    #[must_use]
    pub fn with_authorization_store(mut self, store: Arc<dyn AuthorizationStore>) -> Self {
        self.authorizations = store;
        self
    }

    /// Runner settings.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Registered skills.
    #[must_use]
    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    /// The authorization store.
    #[must_use]
    pub fn authorizations(&self) -> &Arc<dyn AuthorizationStore> {
        &self.authorizations
    }

    /// Request cancellation of a run.
    ///
    /// Takes effect at the run's next checkpoint. Returns `false` if no run
    /// with that ID is in flight.
    pub fn cancel(&self, run_id: &RunId) -> bool {
        self.runs.cancel(run_id)
    }

    /// Snapshots of the in-flight runs.
    #[must_use]
    pub fn active_runs(&self) -> Vec<RunHandle> {
        self.runs.active()
    }

    /// Answer a pending confirmation.
    ///
    /// Returns `false` if the ID is unknown, already answered, or timed out.
    pub fn respond(&self, response: &ConfirmationResponse) -> bool {
        self.broker.respond(response)
    }

    /// Confirmations waiting for an answer.
    #[must_use]
    pub fn pending_confirmations(&self) -> Vec<ConfirmationRequest> {
        self.broker.pending()
    }
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("providers", &self.providers)
            .field("skills", &self.skills)
            .field("broker", &self.broker)
            .field("runs", &self.runs.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
