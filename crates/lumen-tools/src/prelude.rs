//! Prelude module - commonly used types for convenient import.
//!
//! Use `use lumen_tools::prelude::*;` to import all essential types.

// Errors
pub use crate::{SkillError, SkillResult};

// Skills
pub use crate::{Skill, SkillContext, SkillOutcome, SkillOutput, SkillRegistry};

// Text defenses
pub use crate::{ParsedToolCall, Spotlighter, ToolCallParser};
