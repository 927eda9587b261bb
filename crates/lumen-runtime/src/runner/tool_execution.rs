//! Skill dispatch: risk gating, confirmation, authorization memory, and
//! fault isolation.

use futures::FutureExt;
use lumen_approval::{
    AuthorizationCheck, ConfirmationOutcome, ConfirmationRequest, explain_tool_call,
    suggested_scopes,
};
use lumen_core::{RunId, SessionKey};
use lumen_events::AgentEvent;
use lumen_tools::{SkillContext, SkillOutcome, truncate_output};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::run::RunGuard;
use crate::session::Session;

use super::AgentRunner;
use super::execution::RunProgress;

impl AgentRunner {
    /// Execute a skill by name.
    ///
    /// Never fails: unknown names, denials, timeouts, handler errors and
    /// handler panics all come back as failed outcomes. High-output skills
    /// are gated behind an authorization or a human confirmation when a run
    /// ID is present.
    pub async fn execute_skill(
        &self,
        name: &str,
        args: Value,
        session_key: &SessionKey,
        run_id: Option<&RunId>,
    ) -> SkillOutcome {
        let Some(skill) = self.skills.get(name) else {
            warn!(tool = %name, "Model called an unknown skill");
            return SkillOutcome::unknown_skill(name);
        };

        let args = normalize_args(args);

        if self.classifier.classify(name).requires_confirmation()
            && let Some(run_id) = run_id
            && let Err(refusal) = self.authorize(name, &args, run_id).await
        {
            return refusal;
        }

        let ctx = SkillContext::new(
            name,
            self.config.workspace_root.clone(),
            session_key.clone(),
            Arc::clone(&self.shared_config),
            Arc::clone(&self.sink),
        )
        .with_run_id(run_id.cloned());

        debug!(tool = %name, args = %args, "Executing skill");
        match AssertUnwindSafe(skill.execute(args, &ctx)).catch_unwind().await {
            Ok(Ok(output)) => SkillOutcome::success(output),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Skill failed");
                SkillOutcome::failure(e.to_string())
            },
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(tool = %name, panic = %message, "Skill panicked");
                SkillOutcome::failure(format!("Skill panicked: {message}"))
            },
        }
    }

    /// Check remembered approvals, otherwise ask a human.
    ///
    /// Returns the failed outcome to report when the call may not run.
    async fn authorize(&self, name: &str, args: &Value, run_id: &RunId) -> Result<(), SkillOutcome> {
        let check = match self.authorizations.check_authorization(name, args).await {
            Ok(check) => check,
            Err(e) => {
                warn!(tool = %name, error = %e, "Authorization lookup failed, asking instead");
                AuthorizationCheck {
                    authorized: false,
                    matched: None,
                    suggested_scopes: suggested_scopes(name, args),
                }
            },
        };

        if check.authorized {
            if let Some(matched) = &check.matched {
                debug!(
                    tool = %name,
                    authorization_id = %matched.id,
                    scope = %matched.scope,
                    "Call covered by a remembered approval"
                );
            }
            return Ok(());
        }

        let request = ConfirmationRequest::new(
            run_id.clone(),
            name,
            args.clone(),
            self.classifier.reason(name),
        )
        .with_command_explanation(explain_tool_call(name, args))
        .with_suggested_scopes(check.suggested_scopes);

        let event = request.to_event();
        let pending = self.broker.register(request);
        info!(
            confirm_id = %pending.id(),
            run_id = %run_id,
            tool = %name,
            "Waiting for confirmation"
        );
        self.sink.emit(event);

        match self.broker.wait(pending).await {
            ConfirmationOutcome::Approved { remember } => {
                info!(run_id = %run_id, tool = %name, "Call approved");
                if let Some(scope) = remember {
                    match self
                        .authorizations
                        .save_authorization(name, args, scope)
                        .await
                    {
                        Ok(saved) => info!(
                            authorization_id = %saved.id,
                            tool = %name,
                            scope = %saved.scope,
                            "Approval remembered"
                        ),
                        Err(e) => warn!(tool = %name, error = %e, "Failed to remember approval"),
                    }
                }
                Ok(())
            },
            ConfirmationOutcome::Denied => {
                info!(run_id = %run_id, tool = %name, "Call denied");
                Err(SkillOutcome::failure(denial_message(name)))
            },
            ConfirmationOutcome::TimedOut => Err(SkillOutcome::failure(timeout_message(
                name,
                self.broker.timeout().as_secs(),
            ))),
        }
    }

    /// Run one detected call, bracketed by `tool_start` and `tool_end`.
    pub(super) async fn run_tool(
        &self,
        guard: &RunGuard<'_>,
        session: &Session,
        name: &str,
        args: Value,
        progress: &mut RunProgress,
    ) -> SkillOutcome {
        let run_id = guard.run_id();
        guard.record_tool(name);
        progress.record_tool(name);

        self.sink.emit(AgentEvent::ToolStart {
            run_id: run_id.clone(),
            name: name.to_string(),
            params: args.clone(),
        });

        let outcome = self
            .execute_skill(name, args, &session.key, Some(run_id))
            .await;

        self.sink.emit(AgentEvent::ToolEnd {
            run_id: run_id.clone(),
            name: name.to_string(),
            result: if outcome.success {
                outcome.data.clone()
            } else {
                None
            },
            error: outcome.error.clone(),
            media: outcome.media.clone(),
        });

        outcome
    }

    /// Text fed back to the model for one outcome: truncated, and
    /// spotlighted when the tool reads untrusted input.
    pub(super) fn tool_result_content(&self, name: &str, outcome: &SkillOutcome) -> String {
        let content = truncate_output(outcome.content(), self.config.max_tool_output_chars);
        if self.config.spotlight_enabled && self.classifier.classify(name).is_high_input() {
            self.spotlighter.wrap(&content, name)
        } else {
            content
        }
    }
}

/// Arguments as an object; a missing argument value means none.
fn normalize_args(args: Value) -> Value {
    match args {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    }
}

/// Failure text for a denied call.
///
/// The model must not route around the refusal with another tool.
pub(crate) fn denial_message(name: &str) -> String {
    format!(
        "The user denied permission to run `{name}`. Do not attempt the same action through \
         a different tool or workaround. Ask the user how they would like to proceed before \
         proposing any other approach."
    )
}

/// Failure text for an unanswered confirmation.
pub(crate) fn timeout_message(name: &str, secs: u64) -> String {
    format!(
        "Confirmation for `{name}` was not answered within {secs} seconds, so it did not run. \
         Tell the user the action is waiting on their approval."
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
