// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dispatch: turning one operation into a working-graph fragment
//!
//! The executor never talks to a database or service directly. It hands each
//! query or API operation to a [`Dispatcher`], which is where the real graph
//! database and endpoint handlers plug in. [`graph::GraphDispatcher`] is a
//! ready-made dispatcher over a pluggable [`graph::QueryBackend`] and a
//! [`graph::HandlerRegistry`].

pub mod error;
pub mod graph;
pub mod guard;

pub use error::DispatchError;
pub use graph::{ApiHandler, GraphDispatcher, HandlerRegistry, QueryBackend, QueryRow};
pub use tokio_util::sync::CancellationToken;

use crate::ast::{ApiOperation, QueryOperation};
use crate::exec::params::ParamBindings;
use crate::storage::WorkingGraph;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

/// Per-statement information handed to a dispatch
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// Global index of the statement being dispatched
    pub statement: usize,
    /// Resolved program parameters
    pub params: Arc<ParamBindings>,
    /// Raised by the executor when the deadline elapses; dispatches may
    /// await [`CancellationToken::cancelled`] to stop early
    pub cancel: CancellationToken,
    /// Wall-clock deadline of the whole execution
    pub deadline: Instant,
}

impl DispatchContext {
    pub fn new(
        statement: usize,
        params: Arc<ParamBindings>,
        cancel: CancellationToken,
        deadline: Instant,
    ) -> Self {
        Self {
            statement,
            params,
            cancel,
            deadline,
        }
    }

    /// Time left before the execution deadline
    pub fn remaining(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// The seam between the executor and external collaborators
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Run a read-only graph query and map its rows into a working graph
    ///
    /// Implementations must re-check the query text with
    /// [`guard::check_query`] before running it.
    async fn dispatch_query(
        &self,
        op: &QueryOperation,
        ctx: &DispatchContext,
    ) -> Result<WorkingGraph, DispatchError>;

    /// Invoke an allowlisted endpoint handler
    async fn dispatch_api(
        &self,
        op: &ApiOperation,
        ctx: &DispatchContext,
    ) -> Result<WorkingGraph, DispatchError>;
}
