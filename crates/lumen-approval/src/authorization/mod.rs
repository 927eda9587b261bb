//! Remembered authorizations.
//!
//! An [`Authorization`] records that the user approved a tool call and asked
//! for the decision to be remembered. Its [`AuthorizationScope`] decides how
//! far the approval reaches:
//!
//! - `exact`: the same tool with canonically equal arguments
//! - `pattern`: the same tool with a subject matching a stored glob
//! - `tool`: any invocation of the tool

mod pattern;
mod store;

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lumen_core::{AuthorizationId, AuthorizationScope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ApprovalResult;

pub use pattern::{canonical_args, pattern_for, suggested_scopes};
pub use store::{FileAuthorizationStore, MemoryAuthorizationStore};

/// A remembered approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// Unique identifier.
    pub id: AuthorizationId,
    /// Tool the approval applies to.
    pub tool_name: String,
    /// How far the approval reaches.
    pub scope: AuthorizationScope,
    /// Canonical arguments (`exact`) or subject glob (`pattern`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Short human-readable summary.
    pub description: String,
    /// When the approval was remembered.
    pub created_at: DateTime<Utc>,
}

impl Authorization {
    /// Build an authorization from an approved call.
    ///
    /// A `pattern` scope for a call with no derivable pattern is narrowed to
    /// `exact`.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, args: &Value, scope: AuthorizationScope) -> Self {
        let tool_name = tool_name.into();
        let (scope, pattern) = match scope {
            AuthorizationScope::Exact => (scope, Some(canonical_args(args))),
            AuthorizationScope::Pattern => match pattern_for(&tool_name, args) {
                Some(p) => (scope, Some(p)),
                None => {
                    warn!(
                        tool = %tool_name,
                        "No pattern derivable for call, remembering exact arguments instead"
                    );
                    (AuthorizationScope::Exact, Some(canonical_args(args)))
                },
            },
            AuthorizationScope::Tool => (scope, None),
        };

        let description = match (&scope, &pattern) {
            (AuthorizationScope::Tool, _) => format!("any call to {tool_name}"),
            (AuthorizationScope::Pattern, Some(p)) => format!("{tool_name} matching {p}"),
            (_, Some(p)) => format!("{tool_name} with {p}"),
            (_, None) => tool_name.clone(),
        };

        Self {
            id: AuthorizationId::new(),
            tool_name,
            scope,
            pattern,
            description,
            created_at: Utc::now(),
        }
    }

    /// Whether this authorization covers a call.
    #[must_use]
    pub fn matches(&self, tool_name: &str, args: &Value) -> bool {
        if self.tool_name != tool_name {
            return false;
        }
        match (self.scope, self.pattern.as_deref()) {
            (AuthorizationScope::Tool, _) => true,
            (AuthorizationScope::Exact, Some(expected)) => canonical_args(args) == expected,
            (AuthorizationScope::Pattern, Some(glob)) => {
                pattern::pattern_matches(glob, tool_name, args)
            },
            (_, None) => false,
        }
    }
}

/// Result of looking a call up in an [`AuthorizationStore`].
#[derive(Debug, Clone)]
pub struct AuthorizationCheck {
    /// Whether a stored authorization covers the call.
    pub authorized: bool,
    /// The authorization that matched, narrowest scope first.
    pub matched: Option<Authorization>,
    /// Scopes worth offering if the call has to be confirmed.
    pub suggested_scopes: Vec<AuthorizationScope>,
}

impl AuthorizationCheck {
    /// Evaluate a call against a set of authorizations.
    #[must_use]
    pub fn evaluate<'a>(
        authorizations: impl IntoIterator<Item = &'a Authorization>,
        tool_name: &str,
        args: &Value,
    ) -> Self {
        let matched = authorizations
            .into_iter()
            .filter(|a| a.matches(tool_name, args))
            .min_by_key(|a| a.scope.precedence())
            .cloned();
        Self {
            authorized: matched.is_some(),
            matched,
            suggested_scopes: suggested_scopes(tool_name, args),
        }
    }
}

/// Persistent record of remembered approvals.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Check whether a call is covered by a remembered approval.
    async fn check_authorization(
        &self,
        tool_name: &str,
        args: &Value,
    ) -> ApprovalResult<AuthorizationCheck>;

    /// Remember an approval. Returns the stored authorization.
    async fn save_authorization(
        &self,
        tool_name: &str,
        args: &Value,
        scope: AuthorizationScope,
    ) -> ApprovalResult<Authorization>;

    /// All remembered approvals, oldest first.
    async fn list_authorizations(&self) -> ApprovalResult<Vec<Authorization>>;

    /// Forget an approval. Returns `false` if it did not exist.
    async fn revoke_authorization(&self, id: &AuthorizationId) -> ApprovalResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exact_matches_reordered_args() {
        let args: Value = serde_json::from_str(r#"{"to":"a@b.c","subject":"hi"}"#).unwrap();
        let auth = Authorization::new("send_email", &args, AuthorizationScope::Exact);
        let reordered: Value =
            serde_json::from_str(r#"{"subject":"hi","to":"a@b.c"}"#).unwrap();
        assert!(auth.matches("send_email", &reordered));
        assert!(!auth.matches("send_email", &json!({"to": "x@y.z", "subject": "hi"})));
        assert!(!auth.matches("send_message", &reordered));
    }

    #[test]
    fn test_tool_scope_matches_any_args() {
        let auth = Authorization::new("exec", &json!({"command": "ls"}), AuthorizationScope::Tool);
        assert!(auth.pattern.is_none());
        assert!(auth.matches("exec", &json!({"command": "rm -rf /tmp/x"})));
        assert!(!auth.matches("bash", &json!({"command": "ls"})));
    }

    #[test]
    fn test_pattern_without_subject_narrows_to_exact() {
        let args = json!({"to": "a@b.c"});
        let auth = Authorization::new("send_email", &args, AuthorizationScope::Pattern);
        assert_eq!(auth.scope, AuthorizationScope::Exact);
        assert!(auth.matches("send_email", &args));
    }

    #[test]
    fn test_check_reports_narrowest_match() {
        let args = json!({"command": "git status"});
        let exact = Authorization::new("exec", &args, AuthorizationScope::Exact);
        let pattern = Authorization::new("exec", &args, AuthorizationScope::Pattern);
        let tool = Authorization::new("exec", &args, AuthorizationScope::Tool);

        let check = AuthorizationCheck::evaluate([&tool, &pattern, &exact], "exec", &args);
        assert!(check.authorized);
        assert_eq!(check.matched.unwrap().id, exact.id);

        let check = AuthorizationCheck::evaluate([&tool, &pattern], "exec", &args);
        assert_eq!(check.matched.unwrap().id, pattern.id);

        let other = json!({"command": "git status -s"});
        let check = AuthorizationCheck::evaluate([&tool, &exact], "exec", &other);
        assert_eq!(check.matched.unwrap().id, tool.id);
    }

    #[test]
    fn test_check_unauthorized_offers_scopes() {
        let check = AuthorizationCheck::evaluate(
            Vec::<&Authorization>::new(),
            "exec",
            &json!({"command": "ls"}),
        );
        assert!(!check.authorized);
        assert!(check.matched.is_none());
        assert_eq!(check.suggested_scopes.len(), 3);
    }
}
