//! Confirmation request and response types.

use chrono::{DateTime, Utc};
use lumen_core::{AuthorizationScope, CommandExplanation, ConfirmationId, RunId};
use lumen_events::AgentEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request for a human to confirm a high-output tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    /// Opaque ID the response must echo.
    pub id: ConfirmationId,
    /// Run that is waiting on this confirmation.
    pub run_id: RunId,
    /// Tool to be invoked.
    pub tool_name: String,
    /// Arguments of the call.
    pub tool_params: Value,
    /// Human-readable explanation of the risk.
    pub risk_reason: String,
    /// Breakdown of the command for shell-like tools.
    pub command_explanation: Option<CommandExplanation>,
    /// Scopes the user may choose to remember.
    pub suggested_scopes: Vec<AuthorizationScope>,
    /// Whether the decision can be remembered.
    pub can_remember: bool,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl ConfirmationRequest {
    /// Create a request with a fresh ID.
    #[must_use]
    pub fn new(
        run_id: RunId,
        tool_name: impl Into<String>,
        tool_params: Value,
        risk_reason: impl Into<String>,
    ) -> Self {
        Self {
            id: ConfirmationId::new(),
            run_id,
            tool_name: tool_name.into(),
            tool_params,
            risk_reason: risk_reason.into(),
            command_explanation: None,
            suggested_scopes: vec![AuthorizationScope::Exact],
            can_remember: true,
            created_at: Utc::now(),
        }
    }

    /// Attach a command explanation.
    #[must_use]
    pub fn with_command_explanation(mut self, explanation: Option<CommandExplanation>) -> Self {
        self.command_explanation = explanation;
        self
    }

    /// Set the scopes offered to the user.
    #[must_use]
    pub fn with_suggested_scopes(mut self, scopes: Vec<AuthorizationScope>) -> Self {
        self.can_remember = !scopes.is_empty();
        self.suggested_scopes = scopes;
        self
    }

    /// The `confirm_required` event announcing this request.
    #[must_use]
    pub fn to_event(&self) -> AgentEvent {
        AgentEvent::ConfirmRequired {
            confirm_id: self.id.clone(),
            run_id: self.run_id.clone(),
            tool_name: self.tool_name.clone(),
            tool_params: self.tool_params.clone(),
            risk_reason: self.risk_reason.clone(),
            command_explanation: self.command_explanation.clone(),
            suggested_scopes: self.suggested_scopes.clone(),
            can_remember: self.can_remember,
        }
    }
}

/// A response to a confirmation request, as sent by the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    /// The request being answered.
    pub confirm_id: ConfirmationId,
    /// Whether the call is approved.
    pub approved: bool,
    /// Whether to remember the approval.
    #[serde(default)]
    pub remember: Option<bool>,
    /// Scope to remember it with.
    #[serde(default)]
    pub scope: Option<AuthorizationScope>,
}

impl ConfirmationResponse {
    /// Approve once.
    #[must_use]
    pub fn approve(confirm_id: ConfirmationId) -> Self {
        Self {
            confirm_id,
            approved: true,
            remember: None,
            scope: None,
        }
    }

    /// Approve and remember with a scope.
    #[must_use]
    pub fn approve_and_remember(confirm_id: ConfirmationId, scope: AuthorizationScope) -> Self {
        Self {
            confirm_id,
            approved: true,
            remember: Some(true),
            scope: Some(scope),
        }
    }

    /// Deny.
    #[must_use]
    pub fn deny(confirm_id: ConfirmationId) -> Self {
        Self {
            confirm_id,
            approved: false,
            remember: None,
            scope: None,
        }
    }

    /// The decision carried by this response.
    #[must_use]
    pub fn result(&self) -> ConfirmationResult {
        ConfirmationResult {
            approved: self.approved,
            remember: self.remember,
            scope: self.scope,
        }
    }
}

/// The decision delivered to the waiting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    /// Whether the call is approved.
    pub approved: bool,
    /// Whether to remember the approval.
    pub remember: Option<bool>,
    /// Scope to remember it with.
    pub scope: Option<AuthorizationScope>,
}

impl ConfirmationResult {
    /// The scope to persist, if the approval should be remembered.
    ///
    /// Remembering without an explicit scope falls back to the narrowest one.
    #[must_use]
    pub fn remembered_scope(&self) -> Option<AuthorizationScope> {
        if self.approved && self.remember == Some(true) {
            Some(self.scope.unwrap_or(AuthorizationScope::Exact))
        } else {
            None
        }
    }
}

/// How a confirmation wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// The user approved; `remember` carries the scope to persist.
    Approved {
        /// Scope to remember, if any.
        remember: Option<AuthorizationScope>,
    },
    /// The user denied.
    Denied,
    /// Nobody answered before the deadline.
    TimedOut,
}

impl ConfirmationOutcome {
    /// Whether the call may proceed.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}

impl From<ConfirmationResult> for ConfirmationOutcome {
    fn from(result: ConfirmationResult) -> Self {
        if result.approved {
            Self::Approved {
                remember: result.remembered_scope(),
            }
        } else {
            Self::Denied
        }
    }
}
