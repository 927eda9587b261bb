//! Prelude module - commonly used types for convenient import.
//!
//! Use `use lumen_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Runner
pub use crate::{AgentRunner, DetectionMode, RuntimeConfig};

// Runs
pub use crate::{RunRequest, RunResult, RunState};

// Sessions
pub use crate::{JsonSessionStore, MemorySessionStore, Session, SessionMessage, SessionStore};
