//! Test utilities for GraphProgram integration tests
//!
//! - MockDispatcher: scripted dispatcher keyed by query text or endpoint
//! - programs: JSON program builders that go through the validator

#![allow(dead_code)]

pub mod mock_dispatcher;
pub mod programs;

/// Install the test logger once per test binary
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
