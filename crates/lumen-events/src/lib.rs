//! Lumen Events - lifecycle events emitted by agent runs.
//!
//! This crate provides:
//! - [`AgentEvent`], the payloads observers see for every run
//! - The [`EventSink`] trait the runner emits through
//! - A broadcast-based [`EventBus`] implementing the sink
//!
//! # Example
//!
//! ```rust
//! use lumen_core::{RunId, SessionKey};
//! use lumen_events::{AgentEvent, EventBus, EventSink};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(AgentEvent::Start {
//!     run_id: RunId::new(),
//!     session_key: SessionKey::new("web:default"),
//!     prompt_preview: "What's 2+2?".to_string(),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "start");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod event;
mod sink;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::AgentEvent;
pub use sink::{EventSink, NullSink};
