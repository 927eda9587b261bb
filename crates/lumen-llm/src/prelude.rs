//! Prelude module - commonly used types for convenient import.
//!
//! Use `use lumen_llm::prelude::*;` to import all essential types.

pub use crate::{LlmError, LlmResult};

pub use crate::{LlmProvider, ProviderRegistry, StreamBox};

pub use crate::{
    LlmToolDefinition, Message, MessageContent, MessageRole, StreamEvent, ToolCall,
    ToolCallResult, Usage,
};
