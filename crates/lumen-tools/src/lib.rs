//! Lumen Tools - skills and the text-level defenses around them.
//!
//! This crate provides:
//! - The [`Skill`] contract, [`SkillContext`] and [`SkillRegistry`]
//! - [`Spotlighter`], which isolates untrusted tool output behind salted markers
//! - [`ToolCallParser`], which finds tool calls written inline in model text
//! - Output truncation and the text-mode tool-use protocol

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod instructions;
pub mod parser;
mod registry;
mod skill;
pub mod spotlight;
mod truncate;

pub use error::{SkillError, SkillResult};
pub use instructions::tool_instructions;
pub use parser::{ParsedToolCall, ToolCallParser};
pub use registry::SkillRegistry;
pub use skill::{Skill, SkillContext, SkillOutcome, SkillOutput};
pub use spotlight::Spotlighter;
pub use truncate::{MAX_OUTPUT_CHARS, truncate_output};
