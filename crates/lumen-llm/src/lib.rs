//! Lumen LLM - the streaming contract consumed by the agent runner.
//!
//! Provider client implementations live outside this workspace; this crate
//! only defines what the runner needs from them:
//! - Conversation [`Message`]s and tool definitions
//! - The [`StreamEvent`] chunks a provider yields
//! - The [`LlmProvider`] trait and a name-keyed [`ProviderRegistry`]

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod provider;
mod types;

pub use error::{LlmError, LlmResult};
pub use provider::{LlmProvider, ProviderRegistry, StreamBox};
pub use types::{
    ContentPart, LlmToolDefinition, Message, MessageContent, MessageRole, StreamEvent, ToolCall,
    ToolCallResult, Usage,
};
