//! Configuration types for the Lumen runtime.
//!
//! All types in this module are self-contained with no dependencies on other
//! Lumen crates. Enumerated settings (detection mode, risk tiers) are kept as
//! strings here, checked by [`validate`](crate::validate), and converted to
//! domain types at the runtime boundary. Every struct implements [`Default`]
//! so a bare `[section]` header in TOML produces a working configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the Lumen runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent loop behaviour.
    pub runtime: RuntimeSection,
    /// Confirmation and authorization settings.
    pub approval: ApprovalSection,
    /// Spotlighting of untrusted tool output.
    pub spotlight: SpotlightSection,
    /// Tool-call text parser settings.
    pub parser: ParserSection,
    /// Session persistence.
    pub sessions: SessionsSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Named personas selectable per run.
    pub personas: HashMap<String, PersonaSection>,
}

// ---------------------------------------------------------------------------
// RuntimeSection
// ---------------------------------------------------------------------------

/// Agent loop behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Maximum model round-trips per run.
    pub max_iterations: u32,
    /// Tool-call detection mode: `native`, `text` or `hybrid`.
    pub detection_mode: String,
    /// Maximum tokens to request per completion.
    pub max_output_tokens: usize,
    /// Tool output longer than this is truncated before it reaches the model.
    pub max_tool_output_chars: usize,
    /// Length of the prompt preview carried by the `start` event.
    pub prompt_preview_chars: usize,
    /// Provider used when a run does not name one.
    pub default_provider: Option<String>,
    /// Base system prompt.
    pub system_prompt: String,
    /// Working directory exposed to skills. Defaults to the process cwd.
    pub workspace_root: Option<String>,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            detection_mode: "hybrid".to_owned(),
            max_output_tokens: 4096,
            max_tool_output_chars: 30_000,
            prompt_preview_chars: 100,
            default_provider: None,
            system_prompt: "You are Lumen, a helpful assistant. Use the available tools when \
                            they help answer the user."
                .to_owned(),
            workspace_root: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ApprovalSection
// ---------------------------------------------------------------------------

/// Confirmation and authorization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    /// Seconds a run waits for a human answer.
    pub confirmation_timeout_secs: u64,
    /// Tier for tools missing from the risk table (`low`, `high-input`,
    /// `high-output`).
    pub unknown_tool_risk: String,
    /// Per-tool risk tier overrides.
    pub risk_overrides: HashMap<String, String>,
    /// JSON file for remembered authorizations. In-memory when unset.
    pub authorizations_file: Option<String>,
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 120,
            unknown_tool_risk: "low".to_owned(),
            risk_overrides: HashMap::new(),
            authorizations_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SpotlightSection / ParserSection / SessionsSection
// ---------------------------------------------------------------------------

/// Spotlighting of untrusted tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlightSection {
    /// Wrap high-input tool output and add defensive instructions.
    pub enabled: bool,
    /// Random bytes per delimiter salt.
    pub salt_bytes: usize,
}

impl Default for SpotlightSection {
    fn default() -> Self {
        Self {
            enabled: true,
            salt_bytes: 16,
        }
    }
}

/// Tool-call text parser settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSection {
    /// Attempt to repair malformed JSON candidates.
    pub json_repair: bool,
}

impl Default for ParserSection {
    fn default() -> Self {
        Self { json_repair: true }
    }
}

/// Session persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsSection {
    /// Directory for session files. Defaults to `~/.lumen/sessions`.
    pub directory: Option<String>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level: `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// Output format: `pretty`, `compact`, `full` or `json`.
    pub format: String,
    /// Extra filter directives (`lumen_runtime=debug`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// PersonaSection
// ---------------------------------------------------------------------------

/// A named persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSection {
    /// System prompt replacing the base one.
    pub system_prompt: String,
    /// Lower iteration cap for this persona.
    pub max_iterations: Option<u32>,
}
