//! Scripted dispatcher for executor and coordinator tests

use async_trait::async_trait;
use graphprogram::ast::{ApiOperation, QueryOperation};
use graphprogram::dispatch::guard::check_query;
use graphprogram::storage::{GraphLink, GraphNode};
use graphprogram::{DispatchContext, DispatchError, Dispatcher, WorkingGraph};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the mock returns for one query text or endpoint
#[derive(Debug, Clone)]
pub enum Scripted {
    Graph(WorkingGraph),
    Fail(DispatchError),
    /// Returns the graph after the delay unless cancelled first
    Slow(Duration, WorkingGraph),
    Panic,
}

/// Dispatcher returning scripted graphs; unscripted operations yield an
/// empty graph
#[derive(Default)]
pub struct MockDispatcher {
    queries: HashMap<String, Scripted>,
    apis: HashMap<String, Scripted>,
    calls: Mutex<Vec<String>>,
    saw_cancel: AtomicBool,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(mut self, query: &str, graph: WorkingGraph) -> Self {
        self.queries.insert(query.to_string(), Scripted::Graph(graph));
        self
    }

    pub fn on_query_script(mut self, query: &str, script: Scripted) -> Self {
        self.queries.insert(query.to_string(), script);
        self
    }

    pub fn on_api(mut self, endpoint: &str, graph: WorkingGraph) -> Self {
        self.apis.insert(endpoint.to_string(), Scripted::Graph(graph));
        self
    }

    pub fn on_api_script(mut self, endpoint: &str, script: Scripted) -> Self {
        self.apis.insert(endpoint.to_string(), script);
        self
    }

    /// Query texts and endpoints dispatched so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// True if a slow dispatch observed cancellation
    pub fn saw_cancel(&self) -> bool {
        self.saw_cancel.load(Ordering::SeqCst)
    }

    async fn play(
        &self,
        script: Option<Scripted>,
        ctx: &DispatchContext,
    ) -> Result<WorkingGraph, DispatchError> {
        match script {
            None => Ok(WorkingGraph::new()),
            Some(Scripted::Graph(graph)) => Ok(graph),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Slow(delay, graph)) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(graph),
                    _ = ctx.cancel.cancelled() => {
                        self.saw_cancel.store(true, Ordering::SeqCst);
                        Err(DispatchError::Cancelled)
                    }
                }
            }
            Some(Scripted::Panic) => panic!("scripted dispatch panic"),
        }
    }

    fn record(&self, call: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.to_string());
        }
    }
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    async fn dispatch_query(
        &self,
        op: &QueryOperation,
        ctx: &DispatchContext,
    ) -> Result<WorkingGraph, DispatchError> {
        check_query(&op.query)?;
        self.record(&op.query);
        self.play(self.queries.get(&op.query).cloned(), ctx).await
    }

    async fn dispatch_api(
        &self,
        op: &ApiOperation,
        ctx: &DispatchContext,
    ) -> Result<WorkingGraph, DispatchError> {
        self.record(&op.endpoint);
        self.play(self.apis.get(&op.endpoint).cloned(), ctx).await
    }
}

/// Build a graph from node ids and `(from, type, to)` links
pub fn graph(nodes: &[&str], links: &[(&str, &str, &str)]) -> WorkingGraph {
    WorkingGraph::from_parts(
        nodes.iter().map(|id| GraphNode::new(*id, id.to_uppercase())).collect(),
        links
            .iter()
            .map(|(from, rel, to)| GraphLink::new(*from, *rel, *to))
            .collect(),
    )
}
