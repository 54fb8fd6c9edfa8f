// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Program execution engine
//!
//! This module runs validated programs statement by statement, folding each
//! dispatched fragment into the working graph with the statement's operator.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod operators;
pub mod params;
pub mod result;

// Re-export the main types for convenience
pub use config::ExecutorConfig;
pub use context::{evaluate_condition, ExecutionContext};
pub use error::ExecutionError;
pub use executor::ProgramExecutor;
pub use operators::{apply_operator, OperatorOutcome};
pub use params::{resolve_bindings, ParamBindings, ParamValue};
pub use result::{AbortRecord, BranchTaken, ExecutionResult, ExecutionStatus, StepLogEntry};
