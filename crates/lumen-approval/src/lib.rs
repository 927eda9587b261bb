//! Lumen Approval - deciding whether a tool call may run.
//!
//! This crate provides:
//! - Static risk classification of tool names
//! - Structured explanations of shell commands
//! - The confirmation broker that pauses a run until a human answers
//! - Remembered authorizations with exact, pattern and tool scopes
//!
//! # Flow
//!
//! ```text
//! classify(tool) ── low / high-input ──► run
//!        │
//!   high-output
//!        │
//! check_authorization ── authorized ──► run
//!        │
//!  register + emit confirm_required
//!        │
//!  wait ── approved ──► (save_authorization) ──► run
//!        └─ denied / timed out ──► denial result
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod authorization;
pub mod broker;
pub mod error;
pub mod explain;
pub mod request;
pub mod risk;

pub use authorization::{
    Authorization, AuthorizationCheck, AuthorizationStore, FileAuthorizationStore,
    MemoryAuthorizationStore, canonical_args, pattern_for, suggested_scopes,
};
pub use broker::{ConfirmationBroker, DEFAULT_CONFIRMATION_TIMEOUT, PendingConfirmation};
pub use error::{ApprovalError, ApprovalResult};
pub use explain::{explain_command, explain_tool_call, is_shell_tool};
pub use request::{
    ConfirmationOutcome, ConfirmationRequest, ConfirmationResponse, ConfirmationResult,
};
pub use risk::{RiskClassifier, RiskLevel};
