// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Program execution results

pub use crate::ast::OperationKind;
use crate::ast::Operator;
use crate::storage::WorkingGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which branch a conditional took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchTaken {
    Then,
    Else,
}

/// One executed statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLogEntry {
    /// Global statement index, unique and monotonic across nested branches
    pub statement: usize,
    pub operator: Operator,
    pub operation: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchTaken>,
    pub nodes_affected: usize,
    pub links_affected: usize,
    /// Working graph size after this statement
    pub graph_nodes: usize,
    pub graph_links: usize,
    pub duration_ms: u64,
}

/// Terminal state of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Aborted,
    TimedOut,
    Errored,
}

/// Where and why an execution stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortRecord {
    pub statement: usize,
    pub reason: String,
}

/// Program execution result
///
/// Always well-formed, whatever the terminal state: `result` holds the
/// working graph as of the last completed statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub result: WorkingGraph,
    pub log: Vec<StepLogEntry>,
    pub aborted: Option<AbortRecord>,
    pub elapsed_ms: u64,
}

impl ExecutionResult {
    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// Log entries in execution order for the given statement index
    pub fn entry(&self, statement: usize) -> Option<&StepLogEntry> {
        self.log.iter().find(|e| e.statement == statement)
    }

    /// Summary line for logging
    pub fn summary(&self) -> String {
        match &self.aborted {
            None => format!(
                "{:?}: {} nodes, {} links after {} step(s) in {}ms",
                self.status,
                self.result.node_count(),
                self.result.link_count(),
                self.log.len(),
                self.elapsed_ms
            ),
            Some(abort) => format!(
                "{:?} at statement {} ({}): {} nodes, {} links after {} step(s)",
                self.status,
                abort.statement,
                abort.reason,
                self.result.node_count(),
                self.result.link_count(),
                self.log.len()
            ),
        }
    }
}
