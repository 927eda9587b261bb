//! Runner configuration types and defaults.

use lumen_approval::RiskLevel;
use lumen_config::Config;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RuntimeError, RuntimeResult};

/// Default maximum model round-trips per run.
pub(super) const DEFAULT_MAX_ITERATIONS: usize = 10;
/// Default output-token bound per completion.
pub(super) const DEFAULT_MAX_OUTPUT_TOKENS: usize = 4096;
/// Default length of the `start` event prompt preview.
pub(super) const DEFAULT_PROMPT_PREVIEW_CHARS: usize = 100;

/// Where the runner looks for tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Only structured calls returned by the provider.
    Native,
    /// Only calls written inline in the model's text.
    Text,
    /// Native calls first, then inline text.
    #[default]
    Hybrid,
}

impl DetectionMode {
    /// Whether skill definitions go to the provider as structured tools.
    #[must_use]
    pub fn offers_native_tools(self) -> bool {
        matches!(self, Self::Native | Self::Hybrid)
    }

    /// Whether response text is parsed for inline calls.
    #[must_use]
    pub fn parses_text(self) -> bool {
        matches!(self, Self::Text | Self::Hybrid)
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Text => write!(f, "text"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for DetectionMode {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "text" => Ok(Self::Text),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(RuntimeError::ConfigError(format!(
                "invalid detection mode `{other}` (expected native, text or hybrid)"
            ))),
        }
    }
}

/// A named system prompt, optionally with a tighter iteration cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    /// Replaces the base system prompt.
    pub system_prompt: String,
    /// Lowers the iteration cap for runs using this persona.
    pub max_iterations: Option<usize>,
}

/// Configuration for the agent runner.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum model round-trips per run.
    pub max_iterations: usize,
    /// Tool-call detection mode.
    pub detection_mode: DetectionMode,
    /// Output-token bound per completion.
    pub max_output_tokens: usize,
    /// Tool output longer than this is truncated.
    pub max_tool_output_chars: usize,
    /// Length of the `start` event prompt preview.
    pub prompt_preview_chars: usize,
    /// Provider used when a run does not name one.
    pub default_provider: Option<String>,
    /// Base system prompt.
    pub system_prompt: String,
    /// Working directory exposed to skills.
    pub workspace_root: PathBuf,
    /// Spotlight high-input tool output.
    pub spotlight_enabled: bool,
    /// Random bytes per spotlight salt.
    pub spotlight_salt_bytes: usize,
    /// Repair malformed inline tool-call JSON.
    pub json_repair: bool,
    /// How long a run waits for a human answer.
    pub confirmation_timeout: Duration,
    /// Tier for tools missing from the risk table.
    pub unknown_tool_risk: RiskLevel,
    /// Per-tool risk overrides.
    pub risk_overrides: HashMap<String, RiskLevel>,
    /// Named personas.
    pub personas: HashMap<String, Persona>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let workspace_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            detection_mode: DetectionMode::default(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_tool_output_chars: lumen_tools::MAX_OUTPUT_CHARS,
            prompt_preview_chars: DEFAULT_PROMPT_PREVIEW_CHARS,
            default_provider: None,
            system_prompt: String::new(),
            workspace_root,
            spotlight_enabled: true,
            spotlight_salt_bytes: lumen_tools::spotlight::DEFAULT_SALT_BYTES,
            json_repair: true,
            confirmation_timeout: lumen_approval::DEFAULT_CONFIRMATION_TIMEOUT,
            unknown_tool_risk: RiskLevel::Low,
            risk_overrides: HashMap::new(),
            personas: HashMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Convert loaded configuration into runner settings.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ConfigError`] if an enumerated setting does not
    /// parse.
    pub fn from_config(config: &Config) -> RuntimeResult<Self> {
        let runtime = &config.runtime;
        let approval = &config.approval;

        let workspace_root = runtime.workspace_root.as_ref().map_or_else(
            || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            PathBuf::from,
        );

        let unknown_tool_risk = parse_risk("approval.unknown_tool_risk", &approval.unknown_tool_risk)?;
        let risk_overrides = approval
            .risk_overrides
            .iter()
            .map(|(tool, level)| {
                parse_risk(&format!("approval.risk_overrides.{tool}"), level)
                    .map(|level| (tool.clone(), level))
            })
            .collect::<RuntimeResult<HashMap<_, _>>>()?;

        let personas = config
            .personas
            .iter()
            .map(|(name, persona)| {
                (
                    name.clone(),
                    Persona {
                        system_prompt: persona.system_prompt.clone(),
                        max_iterations: persona.max_iterations.map(widen),
                    },
                )
            })
            .collect();

        Ok(Self {
            max_iterations: widen(runtime.max_iterations),
            detection_mode: runtime.detection_mode.parse()?,
            max_output_tokens: runtime.max_output_tokens,
            max_tool_output_chars: runtime.max_tool_output_chars,
            prompt_preview_chars: runtime.prompt_preview_chars,
            default_provider: runtime.default_provider.clone(),
            system_prompt: runtime.system_prompt.clone(),
            workspace_root,
            spotlight_enabled: config.spotlight.enabled,
            spotlight_salt_bytes: config.spotlight.salt_bytes,
            json_repair: config.parser.json_repair,
            confirmation_timeout: Duration::from_secs(approval.confirmation_timeout_secs),
            unknown_tool_risk,
            risk_overrides,
            personas,
        })
    }

    /// Iteration cap for a run, after applying the persona's limit.
    #[must_use]
    pub fn iteration_cap(&self, persona: Option<&Persona>) -> usize {
        persona
            .and_then(|p| p.max_iterations)
            .map_or(self.max_iterations, |cap| cap.min(self.max_iterations))
            .max(1)
    }
}

fn parse_risk(field: &str, value: &str) -> RuntimeResult<RiskLevel> {
    value
        .parse()
        .map_err(|e| RuntimeError::ConfigError(format!("{field}: {e}")))
}

fn widen(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
