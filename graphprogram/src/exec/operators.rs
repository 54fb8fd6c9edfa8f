// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Set-algebra operators over the working graph
//!
//! Every operator leaves the working graph free of dangling links. Node
//! comparisons are by `concept_id` identity only; data already held in the
//! working graph is never replaced by the incoming result.

use crate::ast::Operator;
use crate::exec::error::ExecutionError;
use crate::storage::{GraphSnapshot, WorkingGraph};
use serde::{Deserialize, Serialize};

/// Counts reported by one operator application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorOutcome {
    pub nodes_affected: usize,
    pub links_affected: usize,
}

impl OperatorOutcome {
    pub fn new(nodes_affected: usize, links_affected: usize) -> Self {
        Self {
            nodes_affected,
            links_affected,
        }
    }
}

/// `+`: insert result nodes and links whose keys are not yet present
///
/// Returns the nodes inserted and the links inserted net of any removed by
/// dangling-link enforcement.
pub fn union(graph: &mut WorkingGraph, result: WorkingGraph) -> OperatorOutcome {
    let snapshot = GraphSnapshot::from(result);

    let mut nodes_added: usize = 0;
    for node in snapshot.nodes {
        if graph.insert_node(node) {
            nodes_added += 1;
        }
    }
    let mut links_added: usize = 0;
    for link in snapshot.links {
        if graph.insert_link(link) {
            links_added += 1;
        }
    }
    let links_removed = graph.enforce_no_dangling();

    OperatorOutcome::new(nodes_added, links_added.saturating_sub(links_removed))
}

/// `-`: remove every node whose id appears in the result; the result's
/// links are ignored. Links touching removed nodes cascade away.
pub fn difference(graph: &mut WorkingGraph, result: WorkingGraph) -> OperatorOutcome {
    let removed = graph.retain_nodes(|node| !result.contains_node(&node.concept_id));
    let links_removed = graph.enforce_no_dangling();
    OperatorOutcome::new(removed, links_removed)
}

/// `&`: keep only nodes whose id appears in the result
pub fn intersect(graph: &mut WorkingGraph, result: WorkingGraph) -> OperatorOutcome {
    let removed = graph.retain_nodes(|node| result.contains_node(&node.concept_id));
    let links_removed = graph.enforce_no_dangling();
    OperatorOutcome::new(removed, links_removed)
}

/// `?`: union when the result is non-empty, otherwise nothing
pub fn optional(graph: &mut WorkingGraph, result: WorkingGraph) -> OperatorOutcome {
    if result.is_empty() {
        return OperatorOutcome::default();
    }
    union(graph, result)
}

/// `!`: union when the result is non-empty, otherwise abort
///
/// On failure the working graph is untouched.
pub fn assert(
    graph: &mut WorkingGraph,
    result: WorkingGraph,
    statement: usize,
) -> Result<OperatorOutcome, ExecutionError> {
    if result.is_empty() {
        return Err(ExecutionError::AssertionFailed { statement });
    }
    Ok(union(graph, result))
}

/// Apply the named operator to the working graph
pub fn apply_operator(
    op: Operator,
    graph: &mut WorkingGraph,
    result: WorkingGraph,
    statement: usize,
) -> Result<OperatorOutcome, ExecutionError> {
    let outcome = match op {
        Operator::Union => union(graph, result),
        Operator::Difference => difference(graph, result),
        Operator::Intersect => intersect(graph, result),
        Operator::Optional => optional(graph, result),
        Operator::Assert => assert(graph, result, statement)?,
    };
    debug_assert!(graph.check_invariants().is_ok());
    Ok(outcome)
}
