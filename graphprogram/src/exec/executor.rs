// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Main program executor implementation

use crate::ast::{
    ApiOperation, ConditionalOperation, GraphProgram, Operation, QueryOperation, Statement,
};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::exec::config::ExecutorConfig;
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::operators::apply_operator;
use crate::exec::params::{resolve_bindings, ParamBindings};
use crate::exec::result::{
    AbortRecord, BranchTaken, ExecutionResult, ExecutionStatus, StepLogEntry,
};
use crate::storage::WorkingGraph;
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Why a run stopped before its last statement
#[derive(Debug)]
struct Interrupt {
    statement: usize,
    error: ExecutionError,
}

impl Interrupt {
    fn new(statement: usize, error: ExecutionError) -> Self {
        Self { statement, error }
    }

    fn status(&self) -> ExecutionStatus {
        match self.error {
            ExecutionError::AssertionFailed { .. } => ExecutionStatus::Aborted,
            ExecutionError::Timeout => ExecutionStatus::TimedOut,
            ExecutionError::Dispatch(_)
            | ExecutionError::Parameter(_)
            | ExecutionError::TaskFailed(_) => ExecutionStatus::Errored,
        }
    }

    fn into_record(self) -> AbortRecord {
        AbortRecord {
            statement: self.statement,
            reason: self.error.to_string(),
        }
    }
}

type BlockFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Interrupt>> + Send + 'a>>;

/// Executes validated programs against a [`Dispatcher`]
///
/// Statements run strictly in order. Each dispatch runs on its own tokio
/// task, raced against the execution deadline.
#[derive(Clone)]
pub struct ProgramExecutor {
    dispatcher: Arc<dyn Dispatcher>,
    config: ExecutorConfig,
}

impl std::fmt::Debug for ProgramExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProgramExecutor {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, config: ExecutorConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute a validated program
    ///
    /// Never fails: every terminal state is reported through the returned
    /// [`ExecutionResult`], whose `result` is the working graph as of the
    /// last completed statement.
    pub async fn execute(
        &self,
        program: &GraphProgram,
        bindings: Option<ParamBindings>,
        seed: Option<WorkingGraph>,
    ) -> ExecutionResult {
        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let deadline = clock + self.config.timeout;

        log::info!(
            "Execution {} starting: program '{}', {} top-level statement(s)",
            execution_id,
            program.name().unwrap_or("unnamed"),
            program.statements.len()
        );

        let mut seed = seed.unwrap_or_default();
        let dropped = seed.enforce_no_dangling();
        if dropped > 0 {
            log::warn!("Dropped {} dangling link(s) from seed graph", dropped);
        }

        let runtime = bindings.unwrap_or_default();
        let (status, graph, log, aborted) =
            match resolve_bindings(program.param_declarations(), &runtime) {
                Err(error) => {
                    log::warn!("Execution {}: {}", execution_id, error);
                    let interrupt = Interrupt::new(0, error);
                    (
                        interrupt.status(),
                        seed,
                        Vec::new(),
                        Some(interrupt.into_record()),
                    )
                }
                Ok(params) => {
                    let mut ctx = ExecutionContext::new(seed, params, deadline);
                    let outcome = self.execute_block(&program.statements, &mut ctx).await;
                    ctx.cancel.cancel();
                    match outcome {
                        Ok(()) => (ExecutionStatus::Completed, ctx.graph, ctx.log, None),
                        Err(interrupt) => (
                            interrupt.status(),
                            ctx.graph,
                            ctx.log,
                            Some(interrupt.into_record()),
                        ),
                    }
                }
            };

        let result = ExecutionResult {
            execution_id,
            started_at,
            status,
            result: graph,
            log,
            aborted,
            elapsed_ms: clock.elapsed().as_millis() as u64,
        };
        log::info!("Execution {} finished: {}", execution_id, result.summary());
        result
    }

    fn execute_block<'a>(
        &'a self,
        statements: &'a [Statement],
        ctx: &'a mut ExecutionContext,
    ) -> BlockFuture<'a> {
        Box::pin(async move {
            for statement in statements {
                self.execute_statement(statement, ctx).await?;
            }
            Ok(())
        })
    }

    async fn execute_statement(
        &self,
        statement: &Statement,
        ctx: &mut ExecutionContext,
    ) -> Result<(), Interrupt> {
        let index = ctx.next_index();
        if ctx.deadline_passed() {
            return Err(Interrupt::new(index, ExecutionError::Timeout));
        }
        let started = Instant::now();

        let task = match &statement.operation {
            Operation::Query(op) => self.spawn_query(op, index, ctx),
            Operation::Api(op) => self.spawn_api(op, index, ctx),
            Operation::Conditional(cond) => {
                return self
                    .execute_conditional(statement, cond, index, started, ctx)
                    .await
            }
        };

        let fragment = self
            .await_dispatch(task, ctx)
            .await
            .map_err(|error| Interrupt::new(index, error))?;
        let outcome = apply_operator(statement.op, &mut ctx.graph, fragment, index)
            .map_err(|error| Interrupt::new(index, error))?;

        log::debug!(
            "Statement {} ({} {}): {} node(s), {} link(s) affected",
            index,
            statement.op,
            statement.operation.kind(),
            outcome.nodes_affected,
            outcome.links_affected
        );
        ctx.record(StepLogEntry {
            statement: index,
            operator: statement.op,
            operation: statement.operation.kind(),
            label: statement.label.clone(),
            branch: None,
            nodes_affected: outcome.nodes_affected,
            links_affected: outcome.links_affected,
            graph_nodes: ctx.graph.node_count(),
            graph_links: ctx.graph.link_count(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(())
    }

    async fn execute_conditional(
        &self,
        statement: &Statement,
        cond: &ConditionalOperation,
        index: usize,
        started: Instant,
        ctx: &mut ExecutionContext,
    ) -> Result<(), Interrupt> {
        let (branch, statements) = if ctx.evaluate(&cond.condition) {
            (BranchTaken::Then, cond.then.as_slice())
        } else {
            (BranchTaken::Else, cond.else_branch())
        };
        log::debug!(
            "Statement {}: condition {:?} took {:?} branch ({} statement(s))",
            index,
            cond.condition,
            branch,
            statements.len()
        );

        self.execute_block(statements, ctx).await?;

        ctx.record(StepLogEntry {
            statement: index,
            operator: statement.op,
            operation: statement.operation.kind(),
            label: statement.label.clone(),
            branch: Some(branch),
            nodes_affected: 0,
            links_affected: 0,
            graph_nodes: ctx.graph.node_count(),
            graph_links: ctx.graph.link_count(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(())
    }

    fn spawn_query(
        &self,
        op: &QueryOperation,
        index: usize,
        ctx: &ExecutionContext,
    ) -> JoinHandle<Result<WorkingGraph, DispatchError>> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let dispatch_ctx = ctx.dispatch_context(index);
        let op = op.clone();
        tokio::spawn(async move { dispatcher.dispatch_query(&op, &dispatch_ctx).await })
    }

    fn spawn_api(
        &self,
        op: &ApiOperation,
        index: usize,
        ctx: &ExecutionContext,
    ) -> JoinHandle<Result<WorkingGraph, DispatchError>> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let dispatch_ctx = ctx.dispatch_context(index);
        let op = op.clone();
        tokio::spawn(async move { dispatcher.dispatch_api(&op, &dispatch_ctx).await })
    }

    /// Wait for a dispatch task, cancelling it if the deadline elapses first
    async fn await_dispatch(
        &self,
        mut task: JoinHandle<Result<WorkingGraph, DispatchError>>,
        ctx: &ExecutionContext,
    ) -> Result<WorkingGraph, ExecutionError> {
        match tokio::time::timeout_at(ctx.deadline, &mut task).await {
            Ok(Ok(dispatched)) => Ok(dispatched?),
            Ok(Err(join_error)) => Err(ExecutionError::TaskFailed(join_error.to_string())),
            Err(_) => {
                ctx.cancel.cancel();
                task.abort();
                Err(ExecutionError::Timeout)
            }
        }
    }
}
