//! Static tool risk classification.
//!
//! Every tool name maps to one of three tiers. `high-input` tools pull data
//! from untrusted sources and have their output spotlighted; `high-output`
//! tools perform external effects and are gated behind confirmation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ApprovalError;

/// Risk tier of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    /// Reads from an external or untrusted source.
    HighInput,
    /// Performs an external effect.
    HighOutput,
    /// Internal, no gating.
    Low,
}

impl RiskLevel {
    /// Whether output of this tool must be spotlighted.
    #[must_use]
    pub fn is_high_input(self) -> bool {
        matches!(self, Self::HighInput)
    }

    /// Whether invoking this tool requires an authorization or confirmation.
    #[must_use]
    pub fn requires_confirmation(self) -> bool {
        matches!(self, Self::HighOutput)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighInput => write!(f, "high-input"),
            Self::HighOutput => write!(f, "high-output"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = ApprovalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "high-input" => Ok(Self::HighInput),
            "high-output" => Ok(Self::HighOutput),
            "low" => Ok(Self::Low),
            _ => Err(ApprovalError::InvalidRiskLevel(s.to_string())),
        }
    }
}

/// Built-in classification of known tool names.
const DEFAULT_RISK_TABLE: &[(&str, RiskLevel)] = &[
    // Untrusted input
    ("read_file", RiskLevel::HighInput),
    ("list_directory", RiskLevel::HighInput),
    ("web_fetch", RiskLevel::HighInput),
    ("web_search", RiskLevel::HighInput),
    ("browse_url", RiskLevel::HighInput),
    ("read_email", RiskLevel::HighInput),
    ("read_calendar", RiskLevel::HighInput),
    ("read_clipboard", RiskLevel::HighInput),
    // External effects
    ("exec", RiskLevel::HighOutput),
    ("shell", RiskLevel::HighOutput),
    ("bash", RiskLevel::HighOutput),
    ("run_command", RiskLevel::HighOutput),
    ("write_file", RiskLevel::HighOutput),
    ("edit_file", RiskLevel::HighOutput),
    ("delete_file", RiskLevel::HighOutput),
    ("send_email", RiskLevel::HighOutput),
    ("send_message", RiskLevel::HighOutput),
    ("http_request", RiskLevel::HighOutput),
    ("create_calendar_event", RiskLevel::HighOutput),
    ("schedule_task", RiskLevel::HighOutput),
    // Internal
    ("speak", RiskLevel::Low),
    ("get_time", RiskLevel::Low),
    ("remember", RiskLevel::Low),
    ("recall", RiskLevel::Low),
    ("calculate", RiskLevel::Low),
];

/// Maps tool names to risk tiers.
///
/// Classification is a pure, total function: names outside the table resolve
/// to the configured unknown-tool tier, `low` unless overridden.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    table: HashMap<String, RiskLevel>,
    unknown: RiskLevel,
}

impl RiskClassifier {
    /// Create a classifier with the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: DEFAULT_RISK_TABLE
                .iter()
                .map(|(name, level)| ((*name).to_string(), *level))
                .collect(),
            unknown: RiskLevel::Low,
        }
    }

    /// Override or add the tier of one tool.
    #[must_use]
    pub fn with_override(mut self, tool_name: impl Into<String>, level: RiskLevel) -> Self {
        self.table.insert(tool_name.into(), level);
        self
    }

    /// Set the tier for tools missing from the table.
    ///
    /// `RiskLevel::HighOutput` makes the classifier fail closed.
    #[must_use]
    pub fn with_unknown_default(mut self, level: RiskLevel) -> Self {
        self.unknown = level;
        self
    }

    /// Classify a tool by name.
    #[must_use]
    pub fn classify(&self, tool_name: &str) -> RiskLevel {
        self.table.get(tool_name).copied().unwrap_or(self.unknown)
    }

    /// Human-readable explanation of why a tool is gated.
    #[must_use]
    pub fn reason(&self, tool_name: &str) -> String {
        match self.classify(tool_name) {
            RiskLevel::HighOutput => format!(
                "`{tool_name}` performs an action outside the assistant (sending, writing, \
                 executing) and needs your confirmation"
            ),
            RiskLevel::HighInput => format!(
                "`{tool_name}` reads content from an untrusted source; its output is isolated"
            ),
            RiskLevel::Low => format!("`{tool_name}` is an internal tool"),
        }
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new()
    }
}
