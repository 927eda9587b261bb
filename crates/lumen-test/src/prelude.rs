//! Prelude module - commonly used types for convenient import.
//!
//! Use `use lumen_test::prelude::*;` to import all essential types.

pub use crate::harness::*;
pub use crate::mock_llm::*;
pub use crate::mocks::*;
