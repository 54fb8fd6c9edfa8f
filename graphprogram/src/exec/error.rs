// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use crate::dispatch::DispatchError;
use thiserror::Error;

/// Reason string recorded when an assertion aborts a program
pub const ASSERTION_FAILED_REASON: &str = "assertion failed: empty result";

/// Reason string recorded when the deadline elapses
pub const TIMEOUT_REASON: &str = "execution timed out";

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("assertion failed: empty result")]
    AssertionFailed { statement: usize },

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Dispatch task failed: {0}")]
    TaskFailed(String),

    #[error("execution timed out")]
    Timeout,
}
