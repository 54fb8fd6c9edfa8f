//! Integration tests for the program coordinator and chained execution

#[path = "testutils/mod.rs"]
mod testutils;

use graphprogram::ast::validator::rules;
use graphprogram::{ChainPolicy, ExecutionStatus, ExecutorConfig, ProgramCoordinator};
use serde_json::json;
use std::sync::Arc;
use testutils::mock_dispatcher::{graph, MockDispatcher};
use testutils::programs::{program, program_json, query};

fn coordinator(mock: MockDispatcher) -> (ProgramCoordinator, Arc<MockDispatcher>) {
    testutils::init_logger();
    let mock = Arc::new(mock);
    (
        ProgramCoordinator::new(mock.clone(), ExecutorConfig::default()),
        mock,
    )
}

fn scripted() -> MockDispatcher {
    MockDispatcher::new()
        .on_query("seed", graph(&["a", "b"], &[("a", "R", "b")]))
        .on_query("more", graph(&["c"], &[]))
        .on_query("only_b", graph(&["b"], &[]))
}

#[tokio::test]
async fn test_run_rejects_invalid_program_without_dispatching() {
    let (coordinator, mock) = coordinator(scripted());
    let raw = program_json(vec![query("+", "seed"), query("+", "MATCH (n) DELETE n")]);

    let validation = coordinator.run(&raw, None).await.unwrap_err();
    assert!(!validation.valid);
    assert!(validation.has_rule("V012"));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_run_executes_valid_program() {
    let (coordinator, mock) = coordinator(scripted());
    let raw = program_json(vec![query("+", "seed"), query("+", "more")]);

    assert!(coordinator.validate(&raw).valid);
    let result = coordinator.run(&raw, None).await.unwrap();
    assert!(result.is_completed());
    assert_eq!(result.result.node_count(), 3);
    assert_eq!(mock.calls(), vec!["seed".to_string(), "more".to_string()]);
}

#[tokio::test]
async fn test_run_reports_deserialization_errors() {
    let (coordinator, _) = coordinator(scripted());
    let validation = coordinator
        .run(&json!({"version": 1, "statements": "seed"}), None)
        .await
        .unwrap_err();
    assert_eq!(validation.error_rules(), vec![rules::DESERIALIZE]);
}

#[tokio::test]
async fn test_chain_seeds_each_program_with_previous_graph() {
    let (coordinator, _) = coordinator(scripted());
    let programs = vec![
        program(vec![query("+", "seed")]),
        program(vec![query("+", "more")]),
        program(vec![query("-", "only_b")]),
    ];

    let chain = coordinator
        .execute_chain(&programs, None, ChainPolicy::StopOnAbort)
        .await;

    assert!(chain.is_completed());
    assert_eq!(chain.runs.len(), 3);
    assert_eq!(chain.runs[1].result.node_count(), 3);
    assert!(chain.graph.contains_node("a"));
    assert!(chain.graph.contains_node("c"));
    assert!(!chain.graph.contains_node("b"));
    assert_eq!(chain.graph.link_count(), 0);
}

#[tokio::test]
async fn test_chain_stops_on_abort() {
    let (coordinator, mock) = coordinator(scripted());
    let programs = vec![
        program(vec![query("+", "seed")]),
        program(vec![query("!", "nothing")]),
        program(vec![query("+", "more")]),
    ];

    let chain = coordinator
        .execute_chain(&programs, None, ChainPolicy::StopOnAbort)
        .await;

    assert!(!chain.is_completed());
    assert_eq!(chain.stopped_at, Some(1));
    assert_eq!(chain.runs.len(), 2);
    assert_eq!(chain.runs[1].status, ExecutionStatus::Aborted);
    assert_eq!(chain.graph.node_count(), 2);
    assert!(!mock.calls().contains(&"more".to_string()));
}

#[tokio::test]
async fn test_chain_continues_with_partial_graph() {
    let (coordinator, _) = coordinator(scripted());
    let programs = vec![
        program(vec![query("+", "seed")]),
        program(vec![query("+", "more"), query("!", "nothing")]),
        program(vec![query("&", "only_b")]),
    ];

    let chain = coordinator
        .execute_chain(&programs, None, ChainPolicy::ContinueOnAbort)
        .await;

    assert!(!chain.is_completed());
    assert_eq!(chain.stopped_at, None);
    assert_eq!(chain.runs.len(), 3);
    assert_eq!(chain.runs[1].status, ExecutionStatus::Aborted);
    assert_eq!(chain.runs[1].result.node_count(), 3);
    assert_eq!(chain.graph.node_ids().collect::<Vec<_>>(), vec!["b"]);
}
