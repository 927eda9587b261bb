//! The skill contract.
//!
//! A skill is an in-process tool the model can call. Handlers return
//! [`SkillResult`]; the runner turns every outcome, including unknown names
//! and handler faults, into a [`SkillOutcome`] so nothing escapes as an error.

use std::path::PathBuf;
use std::sync::Arc;

use lumen_config::Config;
use lumen_core::{MediaRef, RunId, SessionKey};
use lumen_events::{AgentEvent, EventSink};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SkillResult;

/// A tool the model can invoke.
#[async_trait::async_trait]
pub trait Skill: Send + Sync {
    /// Name the model calls the skill by.
    fn name(&self) -> &str;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// JSON schema for the arguments.
    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    /// Run the skill.
    async fn execute(&self, args: Value, ctx: &SkillContext) -> SkillResult<SkillOutput>;
}

/// What a handler produced on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillOutput {
    /// Result data shown to the model.
    pub data: Value,
    /// Media produced by the skill.
    pub media: Vec<MediaRef>,
}

impl SkillOutput {
    /// Plain text output.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            data: Value::String(text.into()),
            media: Vec::new(),
        }
    }

    /// Structured output.
    #[must_use]
    pub fn json(data: Value) -> Self {
        Self {
            data,
            media: Vec::new(),
        }
    }

    /// Attach a media reference.
    #[must_use]
    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }
}

/// Result of one skill invocation, as reported to the model and observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillOutcome {
    /// Whether the skill succeeded.
    pub success: bool,
    /// Result data on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Media produced by the skill.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
}

impl SkillOutcome {
    /// A successful outcome.
    #[must_use]
    pub fn success(output: SkillOutput) -> Self {
        Self {
            success: true,
            data: Some(output.data),
            error: None,
            media: output.media,
        }
    }

    /// A failed outcome.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            media: Vec::new(),
        }
    }

    /// The outcome for a name nobody registered.
    #[must_use]
    pub fn unknown_skill(name: &str) -> Self {
        Self::failure(format!("Unknown skill: {name}"))
    }

    /// Text handed back to the model.
    #[must_use]
    pub fn content(&self) -> String {
        if self.success {
            match &self.data {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"))
        }
    }
}

/// Context handed to a skill for one invocation.
#[derive(Clone)]
pub struct SkillContext {
    /// Working-directory root for file access.
    pub workspace_root: PathBuf,
    /// Session the call belongs to.
    pub session_key: SessionKey,
    /// Run the call belongs to, if any.
    pub run_id: Option<RunId>,
    /// Shared configuration.
    pub config: Arc<Config>,
    skill: String,
    sink: Arc<dyn EventSink>,
}

impl SkillContext {
    /// Create a context for invoking `skill`.
    #[must_use]
    pub fn new(
        skill: impl Into<String>,
        workspace_root: PathBuf,
        session_key: SessionKey,
        config: Arc<Config>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            workspace_root,
            session_key,
            run_id: None,
            config,
            skill: skill.into(),
            sink,
        }
    }

    /// Attach the owning run.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Option<RunId>) -> Self {
        self.run_id = run_id;
        self
    }

    /// Name of the skill this context was created for.
    #[must_use]
    pub fn skill(&self) -> &str {
        &self.skill
    }

    /// Publish a skill-defined event, tagged with this skill and run.
    pub fn emit(&self, event: impl Into<String>, payload: Value) {
        self.sink.emit(AgentEvent::Skill {
            run_id: self.run_id.clone(),
            session_key: self.session_key.clone(),
            skill: self.skill.clone(),
            event: event.into(),
            payload,
        });
    }
}

impl std::fmt::Debug for SkillContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillContext")
            .field("skill", &self.skill)
            .field("workspace_root", &self.workspace_root)
            .field("session_key", &self.session_key)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}
