//! Prelude module - commonly used types for convenient import.
//!
//! Use `use lumen_core::prelude::*;` to import all essential types.

// Identifiers
pub use crate::{AuthorizationId, ConfirmationId, RunId, SessionKey};

// Wire types
pub use crate::{AuthorizationScope, CommandExplanation, CommandRisk, MediaRef, RunStatus};
