//! Shared test utilities for atelier integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated test execution with a temp media root
//! - `ConfigBuilder` for writing config files programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
