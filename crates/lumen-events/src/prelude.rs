//! Prelude module - commonly used types for convenient import.
//!
//! Use `use lumen_events::prelude::*;` to import all essential types.

pub use crate::{AgentEvent, EventBus, EventReceiver, EventSink};
