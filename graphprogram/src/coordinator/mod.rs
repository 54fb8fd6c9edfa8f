// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Program Coordinator - Central orchestration for program execution
//!
//! The ProgramCoordinator is the entry point an outer surface (HTTP route,
//! CLI command) calls: validate first, then execute, optionally chaining
//! several programs over one working graph.

pub mod program_coordinator;

pub use program_coordinator::{ChainPolicy, ChainResult, ProgramCoordinator};
