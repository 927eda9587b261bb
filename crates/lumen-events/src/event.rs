//! Event types emitted over the course of an agent run.

use lumen_core::{
    AuthorizationScope, CommandExplanation, ConfirmationId, MediaRef, RunId, RunStatus, SessionKey,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle events of an agent run.
///
/// Every run emits exactly one `Start` first and exactly one `End` last;
/// everything else for that run id falls in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AgentEvent {
    /// The run started.
    Start {
        /// Run ID.
        run_id: RunId,
        /// Session the run belongs to.
        session_key: SessionKey,
        /// Shortened user prompt.
        prompt_preview: String,
    },

    /// A streamed text delta from the model.
    Token {
        /// Run ID.
        run_id: RunId,
        /// Text delta, in arrival order.
        delta: String,
    },

    /// A tool is about to run.
    ToolStart {
        /// Run ID.
        run_id: RunId,
        /// Tool name.
        name: String,
        /// Tool arguments.
        params: Value,
    },

    /// A tool finished.
    ToolEnd {
        /// Run ID.
        run_id: RunId,
        /// Tool name.
        name: String,
        /// Result data on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error message on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Media produced by the tool.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        media: Vec<MediaRef>,
    },

    /// A high-output tool needs human confirmation.
    ConfirmRequired {
        /// Confirmation ID to answer with.
        confirm_id: ConfirmationId,
        /// Run ID.
        run_id: RunId,
        /// Tool name.
        tool_name: String,
        /// Tool arguments.
        tool_params: Value,
        /// Why confirmation is needed.
        risk_reason: String,
        /// Breakdown of the command for shell-like tools.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command_explanation: Option<CommandExplanation>,
        /// Scopes the user may choose to remember.
        suggested_scopes: Vec<AuthorizationScope>,
        /// Whether the decision can be remembered.
        can_remember: bool,
    },

    /// Custom event published by a skill through its context.
    Skill {
        /// Run ID, when the skill runs inside a run.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        /// Session the skill runs for.
        session_key: SessionKey,
        /// Skill name.
        skill: String,
        /// Skill-defined event name.
        event: String,
        /// Skill-defined payload.
        payload: Value,
    },

    /// The run ended.
    End {
        /// Run ID.
        run_id: RunId,
        /// Terminal status.
        status: RunStatus,
        /// Tools used during the run, in call order.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tools_used: Vec<String>,
        /// Error message for failed runs.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl AgentEvent {
    /// Wire name of the event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Token { .. } => "token",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::ConfirmRequired { .. } => "confirm_required",
            Self::Skill { .. } => "skill",
            Self::End { .. } => "end",
        }
    }

    /// Run the event belongs to, if any.
    #[must_use]
    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            Self::Start { run_id, .. }
            | Self::Token { run_id, .. }
            | Self::ToolStart { run_id, .. }
            | Self::ToolEnd { run_id, .. }
            | Self::ConfirmRequired { run_id, .. }
            | Self::End { run_id, .. } => Some(run_id),
            Self::Skill { run_id, .. } => run_id.as_ref(),
        }
    }

    /// Whether this is the terminal event of a run.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End { .. })
    }
}
