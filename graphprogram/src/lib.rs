// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphProgram - Validated, composable graph-query programs
//!
//! A graph program is a JSON document listing statements. Each statement
//! pairs a set-algebra operator with an operation (a read-only graph query,
//! an allowlisted API call, or a conditional over the working graph). The
//! executor folds every dispatched result into one working graph.
//!
//! # Features
//!
//! - **Layered validation**: deserialization, structure, safety and semantic
//!   layers reported as one list of rule-tagged issues
//! - **Read-only by construction**: mutation keywords and unbounded traversals
//!   are refused at validation time and again at dispatch time
//! - **Set algebra**: union, difference, intersect, optional and assert over
//!   a working graph that never holds dangling links
//! - **Bounded execution**: wall-clock deadline with cooperative cancellation
//!   and partial results on every terminal state
//!
//! # Usage
//!
//! ```ignore
//! use graphprogram::{ExecutorConfig, ProgramCoordinator};
//!
//! let coordinator = ProgramCoordinator::new(dispatcher, ExecutorConfig::default());
//! match coordinator.run(&program_json, None).await {
//!     Ok(result) => println!("{}", result.summary()),
//!     Err(validation) => eprintln!("{} error(s)", validation.errors.len()),
//! }
//! ```

pub mod ast;
pub mod catalog;
pub mod coordinator;
pub mod dispatch;
pub mod exec;
pub mod storage;

pub use ast::validator::{
    parse_validated, validate, validate_ast, ValidationIssue, ValidationResult,
    MAX_NESTING_DEPTH, MAX_STATEMENTS,
};
pub use ast::{
    Condition, GraphProgram, Operation, Operator, ParamDeclaration, ParamType, Statement,
    PROGRAM_VERSION,
};
pub use coordinator::{ChainPolicy, ChainResult, ProgramCoordinator};
pub use dispatch::{
    CancellationToken, DispatchContext, DispatchError, Dispatcher, GraphDispatcher, HandlerRegistry,
};
pub use exec::{
    ExecutionError, ExecutionResult, ExecutionStatus, ExecutorConfig, ParamBindings, ParamValue,
    ProgramExecutor, StepLogEntry,
};
pub use storage::{GraphLink, GraphNode, WorkingGraph};

/// GraphProgram version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GraphProgram crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
