// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dispatcher over a pluggable query backend and endpoint handler table

use super::guard::prepare_query;
use super::{DispatchContext, DispatchError, Dispatcher};
use crate::ast::{ApiOperation, QueryOperation};
use crate::catalog::endpoints;
use crate::exec::params::ParamBindings;
use crate::storage::{GraphLink, GraphNode, WorkingGraph};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One result row: column name to value
pub type QueryRow = Map<String, Value>;

/// Executes one validated, read-only query string against the graph database
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn run_query(
        &self,
        query: &str,
        params: &ParamBindings,
    ) -> Result<Vec<QueryRow>, DispatchError>;
}

/// Handler behind one allowlisted endpoint
#[async_trait]
pub trait ApiHandler: Send + Sync {
    /// `params` holds only the parameters the allowlist declares
    async fn handle(
        &self,
        params: &Map<String, Value>,
        ctx: &DispatchContext,
    ) -> Result<WorkingGraph, DispatchError>;
}

/// Endpoint name to handler; only allowlisted endpoints can be registered
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn ApiHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("endpoints", &self.endpoints())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the endpoint
    pub fn register(
        &mut self,
        endpoint: &str,
        handler: Arc<dyn ApiHandler>,
    ) -> Result<(), DispatchError> {
        let spec = endpoints::lookup(endpoint)
            .ok_or_else(|| DispatchError::UnknownEndpoint(endpoint.to_string()))?;
        self.handlers.insert(spec.name, handler);
        Ok(())
    }

    pub fn get(&self, endpoint: &str) -> Option<Arc<dyn ApiHandler>> {
        self.handlers.get(endpoint).cloned()
    }

    /// Registered endpoint names, sorted
    pub fn endpoints(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Dispatcher that guards and caps queries before handing them to a
/// [`QueryBackend`], and routes API calls through a [`HandlerRegistry`]
pub struct GraphDispatcher<B> {
    backend: B,
    handlers: HandlerRegistry,
}

impl<B: QueryBackend> GraphDispatcher<B> {
    pub fn new(backend: B, handlers: HandlerRegistry) -> Self {
        Self { backend, handlers }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }
}

#[async_trait]
impl<B: QueryBackend> Dispatcher for GraphDispatcher<B> {
    async fn dispatch_query(
        &self,
        op: &QueryOperation,
        ctx: &DispatchContext,
    ) -> Result<WorkingGraph, DispatchError> {
        let query = prepare_query(op)?;
        log::debug!("Statement {}: running query: {}", ctx.statement, query);

        let rows = tokio::select! {
            rows = self.backend.run_query(&query, &ctx.params) => rows?,
            _ = ctx.cancel.cancelled() => return Err(DispatchError::Cancelled),
        };
        Ok(rows_to_graph(&rows))
    }

    async fn dispatch_api(
        &self,
        op: &ApiOperation,
        ctx: &DispatchContext,
    ) -> Result<WorkingGraph, DispatchError> {
        let spec = endpoints::lookup(&op.endpoint)
            .ok_or_else(|| DispatchError::UnknownEndpoint(op.endpoint.clone()))?;
        let handler = self
            .handlers
            .get(spec.name)
            .ok_or_else(|| DispatchError::UnknownEndpoint(op.endpoint.clone()))?;

        let params: Map<String, Value> = op
            .params
            .iter()
            .filter(|(name, _)| spec.param(name).is_some())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if let Some(missing) = spec.required.iter().find(|p| !params.contains_key(p.name)) {
            return Err(DispatchError::InvalidParameter(format!(
                "{} requires '{}'",
                spec.name, missing.name
            )));
        }

        log::debug!("Statement {}: calling endpoint {}", ctx.statement, spec.name);
        let outcome = tokio::select! {
            graph = handler.handle(&params, ctx) => graph,
            _ = ctx.cancel.cancelled() => Err(DispatchError::Cancelled),
        };
        outcome.map_err(|err| match err {
            DispatchError::Cancelled | DispatchError::Handler { .. } => err,
            other => {
                log::warn!("Endpoint {} failed: {}", spec.name, other);
                DispatchError::Handler {
                    endpoint: spec.name.to_string(),
                    message: other.to_string(),
                }
            }
        })
    }
}

const NODE_KEYS: &[&str] = &["concept_id", "label", "ontology"];
const LINK_KEYS: &[&str] = &["from_id", "to_id", "relationship_type", "type"];

fn remaining_properties(obj: &Map<String, Value>, reserved: &[&str]) -> Map<String, Value> {
    obj.iter()
        .filter(|(k, _)| !reserved.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn collect_value(value: &Value, nodes: &mut Vec<GraphNode>, links: &mut Vec<GraphLink>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_value(item, nodes, links);
            }
        }
        Value::Object(obj) => {
            if let Some(concept_id) = obj.get("concept_id").and_then(Value::as_str) {
                let mut node = GraphNode::new(
                    concept_id,
                    obj.get("label").and_then(Value::as_str).unwrap_or_default(),
                );
                node.ontology = obj
                    .get("ontology")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                node.properties = remaining_properties(obj, NODE_KEYS);
                nodes.push(node);
                return;
            }

            let from = obj.get("from_id").and_then(Value::as_str);
            let to = obj.get("to_id").and_then(Value::as_str);
            let rel = obj
                .get("relationship_type")
                .or_else(|| obj.get("type"))
                .and_then(Value::as_str);
            if let (Some(from), Some(to), Some(rel)) = (from, to, rel) {
                let mut link = GraphLink::new(from, rel, to);
                link.properties = remaining_properties(obj, LINK_KEYS);
                links.push(link);
            }
        }
        _ => {}
    }
}

/// Map raw rows into a working graph
///
/// Objects with a `concept_id` become nodes; objects with `from_id`, `to_id`
/// and `relationship_type` (or `type`) become links; arrays such as paths
/// are flattened. Links whose endpoints are not nodes of the same result
/// are discarded.
pub fn rows_to_graph(rows: &[QueryRow]) -> WorkingGraph {
    let mut nodes = Vec::new();
    let mut links = Vec::new();
    for row in rows {
        for value in row.values() {
            collect_value(value, &mut nodes, &mut links);
        }
    }

    let link_candidates = links.len();
    let graph = WorkingGraph::from_parts(nodes, links);
    let unresolved = link_candidates.saturating_sub(graph.link_count());
    if unresolved > 0 {
        log::debug!("Discarded {} link(s) with unresolved or duplicate keys", unresolved);
    }
    graph
}
