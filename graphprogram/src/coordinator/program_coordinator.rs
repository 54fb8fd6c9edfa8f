// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Program Coordinator - validation gate and chained execution
//!
//! Wraps a [`ProgramExecutor`] so untrusted input is always validated before
//! it runs, and sequences several programs over one shared working graph.

use crate::ast::validator::{self, ValidationResult};
use crate::ast::GraphProgram;
use crate::dispatch::Dispatcher;
use crate::exec::{ExecutionResult, ExecutorConfig, ParamBindings, ProgramExecutor};
use crate::storage::WorkingGraph;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// What a chain does after a program ends in any state other than completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainPolicy {
    /// Stop the chain at the first program that did not complete
    #[default]
    StopOnAbort,
    /// Carry the partial working graph forward and keep going
    ContinueOnAbort,
}

/// Outcome of a chain of programs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResult {
    /// One result per program that ran, in order
    pub runs: Vec<ExecutionResult>,
    /// Working graph after the last program that ran
    pub graph: WorkingGraph,
    /// Index of the program the chain stopped at, if it stopped early
    pub stopped_at: Option<usize>,
}

impl ChainResult {
    /// True when every program ran and completed
    pub fn is_completed(&self) -> bool {
        self.stopped_at.is_none() && self.runs.iter().all(ExecutionResult::is_completed)
    }
}

/// Program Coordinator - validates and executes programs
#[derive(Debug, Clone)]
pub struct ProgramCoordinator {
    executor: ProgramExecutor,
}

impl ProgramCoordinator {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, config: ExecutorConfig) -> Self {
        Self {
            executor: ProgramExecutor::new(dispatcher, config),
        }
    }

    pub fn executor(&self) -> &ProgramExecutor {
        &self.executor
    }

    /// Validate untrusted input without executing it
    pub fn validate(&self, raw: &Value) -> ValidationResult {
        validator::validate(raw)
    }

    /// Validate untrusted input and execute it when valid
    ///
    /// Returns the validation result instead when the program is invalid;
    /// an invalid program is never executed.
    pub async fn run(
        &self,
        raw: &Value,
        bindings: Option<ParamBindings>,
    ) -> Result<ExecutionResult, ValidationResult> {
        let (program, validation) = validator::parse_validated(raw)?;
        for warning in &validation.warnings {
            log::warn!("Program validation warning: {}", warning);
        }
        Ok(self.executor.execute(&program, bindings, None).await)
    }

    /// Execute an already validated program
    pub async fn execute(
        &self,
        program: &GraphProgram,
        bindings: Option<ParamBindings>,
        seed: Option<WorkingGraph>,
    ) -> ExecutionResult {
        self.executor.execute(program, bindings, seed).await
    }

    /// Run validated programs back to back, each seeded with the working
    /// graph the previous one left behind
    pub async fn execute_chain(
        &self,
        programs: &[GraphProgram],
        bindings: Option<ParamBindings>,
        policy: ChainPolicy,
    ) -> ChainResult {
        let mut graph = WorkingGraph::new();
        let mut runs = Vec::with_capacity(programs.len());
        let mut stopped_at = None;

        for (position, program) in programs.iter().enumerate() {
            let result = self
                .executor
                .execute(program, bindings.clone(), Some(graph))
                .await;
            graph = result.result.clone();
            let completed = result.is_completed();
            runs.push(result);

            if !completed {
                match policy {
                    ChainPolicy::StopOnAbort => {
                        log::info!("Chain stopped at program {} of {}", position, programs.len());
                        stopped_at = Some(position);
                        break;
                    }
                    ChainPolicy::ContinueOnAbort => {
                        log::info!("Program {} did not complete, continuing chain", position);
                    }
                }
            }
        }

        ChainResult {
            runs,
            graph,
            stopped_at,
        }
    }
}
