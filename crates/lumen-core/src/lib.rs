//! Lumen Core - identifiers and wire types shared by every Lumen crate.
//!
//! This crate provides:
//! - Opaque identifiers for runs, confirmations and authorizations
//! - Session keys and media references
//! - The terminal status of an agent run
//! - Authorization scopes and structured command explanations

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod authorization;
pub mod types;
pub mod utils;

pub use authorization::{AuthorizationScope, CommandExplanation, CommandRisk};
pub use types::{AuthorizationId, ConfirmationId, MediaRef, RunId, RunStatus, SessionKey};
pub use utils::{preview, truncate_to_boundary};
