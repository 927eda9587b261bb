//! Authorization scopes and command explanations shared between the
//! approval workflow and the event stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Breadth of a remembered user approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationScope {
    /// Only identical arguments.
    Exact,
    /// Arguments of the same shape (same command family, directory, host).
    Pattern,
    /// Any invocation of the tool.
    Tool,
}

impl AuthorizationScope {
    /// Match precedence: exact before pattern before tool.
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Exact => 0,
            Self::Pattern => 1,
            Self::Tool => 2,
        }
    }
}

impl fmt::Display for AuthorizationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Pattern => write!(f, "pattern"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Risk derived from inspecting a shell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandRisk {
    /// Read-only or otherwise harmless.
    Low,
    /// Modifies local state.
    Medium,
    /// Destructive, networked or privilege-changing.
    High,
    /// Can wipe data or take over the machine.
    Critical,
}

impl fmt::Display for CommandRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Human-readable breakdown of a shell command shown in confirmation prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExplanation {
    /// One-line summary.
    pub summary: String,
    /// One entry per pipeline or list segment.
    pub details: Vec<String>,
    /// Warnings about destructive or escalating constructs.
    pub warnings: Vec<String>,
    /// Overall risk.
    pub risk: CommandRisk,
}
