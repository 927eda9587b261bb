//! Lumen Runtime - the agent orchestration loop.
//!
//! This crate provides:
//! - [`AgentRunner`], which streams a model response, detects tool calls
//!   (native first, then inline text, then answers disguised as calls),
//!   gates and executes them, and loops until the model answers
//! - The run table with cooperative cancellation
//! - Sessions and the [`SessionStore`] persistence contract
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lumen_config::Config;
//! use lumen_events::EventBus;
//! use lumen_llm::ProviderRegistry;
//! use lumen_runtime::{AgentRunner, MemorySessionStore, RunRequest};
//! use lumen_tools::SkillRegistry;
//!
//! # async fn example(providers: ProviderRegistry) -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Arc::new(EventBus::new());
//! let runner = AgentRunner::new(
//!     providers,
//!     SkillRegistry::new(),
//!     Arc::new(MemorySessionStore::new()),
//!     bus.clone(),
//!     Arc::new(Config::default()),
//! )?;
//!
//! let result = runner
//!     .run(RunRequest::new("What's 2+2?", "web:default"))
//!     .await?;
//! println!("{}: {}", result.status, result.answer);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod run;
mod runner;
mod session;
mod store;

pub use error::{RuntimeError, RuntimeResult};
pub use run::{RunHandle, RunRequest, RunResult, RunState, RunTable};
pub use runner::{AgentRunner, DetectionMode, Persona, RuntimeConfig};
pub use session::{Session, SessionMessage, SessionRole};
pub use store::{JsonSessionStore, MemorySessionStore, SessionStore};
