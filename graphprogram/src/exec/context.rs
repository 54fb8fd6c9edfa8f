// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-execution state

use crate::ast::Condition;
use crate::dispatch::{CancellationToken, DispatchContext};
use crate::exec::params::ParamBindings;
use crate::exec::result::StepLogEntry;
use crate::storage::WorkingGraph;
use std::sync::Arc;
use tokio::time::Instant;

/// State owned by a single program execution
///
/// The working graph is never shared between executions, so no locking is
/// involved. The statement counter is threaded through nested conditional
/// branches so indices stay globally unique and monotonic.
#[derive(Debug)]
pub struct ExecutionContext {
    /// Working graph built up so far
    pub graph: WorkingGraph,
    /// Completed statements in completion order
    pub log: Vec<StepLogEntry>,
    /// Resolved parameters handed to every dispatch
    pub params: Arc<ParamBindings>,
    pub cancel: CancellationToken,
    pub deadline: Instant,
    next_statement: usize,
}

impl ExecutionContext {
    pub fn new(seed: WorkingGraph, params: ParamBindings, deadline: Instant) -> Self {
        Self {
            graph: seed,
            log: Vec::new(),
            params: Arc::new(params),
            cancel: CancellationToken::new(),
            deadline,
            next_statement: 0,
        }
    }

    /// Claim the next global statement index
    pub fn next_index(&mut self) -> usize {
        let index = self.next_statement;
        self.next_statement += 1;
        index
    }

    /// Number of statements started so far
    pub fn statements_started(&self) -> usize {
        self.next_statement
    }

    pub fn deadline_passed(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Context handed to the dispatch of one statement
    pub fn dispatch_context(&self, statement: usize) -> DispatchContext {
        DispatchContext::new(
            statement,
            Arc::clone(&self.params),
            self.cancel.clone(),
            self.deadline,
        )
    }

    pub fn record(&mut self, entry: StepLogEntry) {
        self.log.push(entry);
    }

    /// Evaluate a condition against the current working graph
    pub fn evaluate(&self, condition: &Condition) -> bool {
        evaluate_condition(condition, &self.graph)
    }
}

/// Evaluate a condition against a working graph
///
/// Counts are over nodes only.
pub fn evaluate_condition(condition: &Condition, graph: &WorkingGraph) -> bool {
    let nodes = graph.node_count() as u64;
    match condition {
        Condition::HasResults => nodes > 0,
        Condition::Empty => nodes == 0,
        Condition::CountGte { value } => nodes >= *value,
        Condition::CountLte { value } => nodes <= *value,
        Condition::HasOntology { ontology } => graph.has_ontology(ontology),
        Condition::HasRelationship { relationship_type } => {
            graph.has_relationship(relationship_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{GraphLink, GraphNode};
    use std::time::Duration;

    fn sample() -> WorkingGraph {
        WorkingGraph::from_parts(
            vec![
                GraphNode::new("c1", "Entropy").with_ontology("physics"),
                GraphNode::new("c2", "Disorder"),
            ],
            vec![GraphLink::new("c1", "IMPLIES", "c2")],
        )
    }

    #[test]
    fn test_conditions() {
        let g = sample();
        let empty = WorkingGraph::new();

        assert!(evaluate_condition(&Condition::HasResults, &g));
        assert!(!evaluate_condition(&Condition::HasResults, &empty));
        assert!(evaluate_condition(&Condition::Empty, &empty));
        assert!(evaluate_condition(&Condition::CountGte { value: 2 }, &g));
        assert!(!evaluate_condition(&Condition::CountGte { value: 3 }, &g));
        assert!(evaluate_condition(&Condition::CountLte { value: 2 }, &g));
        assert!(!evaluate_condition(&Condition::CountLte { value: 1 }, &g));
        assert!(evaluate_condition(
            &Condition::HasOntology {
                ontology: "physics".into()
            },
            &g
        ));
        assert!(!evaluate_condition(
            &Condition::HasOntology {
                ontology: "biology".into()
            },
            &g
        ));
        assert!(evaluate_condition(
            &Condition::HasRelationship {
                relationship_type: "IMPLIES".into()
            },
            &g
        ));
    }

    #[tokio::test]
    async fn test_statement_counter_and_dispatch_context() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut ctx = ExecutionContext::new(WorkingGraph::new(), ParamBindings::new(), deadline);
        assert_eq!(ctx.next_index(), 0);
        assert_eq!(ctx.next_index(), 1);
        assert_eq!(ctx.statements_started(), 2);

        let dispatch = ctx.dispatch_context(1);
        assert_eq!(dispatch.statement, 1);
        assert!(!ctx.deadline_passed());
        ctx.cancel.cancel();
        assert!(dispatch.cancel.is_cancelled());
    }
}
