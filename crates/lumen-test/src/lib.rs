//! Lumen Test - shared test utilities for the Lumen runtime.
//!
//! This crate provides scripted doubles for the runner's collaborators and
//! small harness helpers, for use as a dev-dependency.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_test::prelude::*;
//!
//! #[tokio::test]
//! async fn answers_directly() {
//!     let provider = MockLlmProvider::new(vec![MockLlmTurn::text("4")]);
//!     let sink = RecordingSink::new();
//!     // ... build a runner with `provider` and `sink`
//!     assert_eq!(sink.event_types().last().map(String::as_str), Some("end"));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod harness;
pub mod mock_llm;
pub mod mocks;

pub use harness::*;
pub use mock_llm::*;
pub use mocks::*;
