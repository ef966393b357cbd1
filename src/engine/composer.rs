// src/engine/composer.rs

//! Executes run sequences and single tasks.
//!
//! Tasks do blocking file IO, so each one runs on Tokio's blocking pool.
//! A series waits for each step before starting the next; the first error
//! ends the whole sequence and nothing after it starts.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::engine::TaskName;
use crate::engine::sequence::{RunSequence, Step};
use crate::errors::{PipelineError, Result};
use crate::tasks::{TaskContext, TaskOutcome, TaskRegistry};

/// Outcome of every task that ran, in completion order within series.
pub type RunReport = Vec<(TaskName, TaskOutcome)>;

type StepFuture = Pin<Box<dyn Future<Output = Result<RunReport>> + Send + 'static>>;

#[derive(Debug, Clone)]
pub struct Composer {
    registry: Arc<TaskRegistry>,
    ctx: TaskContext,
}

impl Composer {
    pub fn new(registry: Arc<TaskRegistry>, ctx: TaskContext) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// Run a whole sequence. Unknown task names are rejected before
    /// anything runs.
    pub async fn run(&self, sequence: &RunSequence) -> Result<RunReport> {
        sequence.validate(&self.registry)?;
        info!(sequence = %sequence, "starting run");
        let started = Instant::now();
        let report = self.run_step(sequence.root().clone()).await?;
        info!(tasks = report.len(), elapsed_ms = started.elapsed().as_millis() as u64, "run finished");
        Ok(report)
    }

    /// Run one registered task to completion.
    pub async fn run_task(&self, name: &str) -> Result<TaskOutcome> {
        let task = self.registry.get(name)?;
        let ctx = self.ctx.clone();
        let started = Instant::now();
        info!(task = %name, "task started");

        let outcome = tokio::task::spawn_blocking(move || task.run(&ctx))
            .await
            .map_err(|e| PipelineError::Other(anyhow!("task `{name}` panicked or was cancelled: {e}")))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(TaskOutcome::Success { written }) => {
                info!(task = %name, written, elapsed_ms, "task finished");
            }
            Ok(TaskOutcome::Degraded { reason }) => {
                warn!(task = %name, reason = %reason, elapsed_ms, "task finished degraded");
            }
            Err(e) => {
                warn!(task = %name, error = %e, elapsed_ms, "task failed");
            }
        }
        outcome
    }

    fn run_step(&self, step: Step) -> StepFuture {
        let this = self.clone();
        Box::pin(async move {
            match step {
                Step::Task(name) => {
                    let outcome = this.run_task(&name).await?;
                    Ok(vec![(name, outcome)])
                }
                Step::Series(steps) => {
                    let mut report = Vec::new();
                    for step in steps {
                        report.extend(this.run_step(step).await?);
                    }
                    Ok(report)
                }
                Step::Parallel(steps) => this.run_parallel(steps).await,
            }
        })
    }

    /// Start every child, wait for all of them, then report the first
    /// error if any. Reports come back in declaration order.
    async fn run_parallel(&self, steps: Vec<Step>) -> Result<RunReport> {
        let mut set = JoinSet::new();
        for (idx, step) in steps.into_iter().enumerate() {
            let fut = self.run_step(step);
            set.spawn(async move { (idx, fut.await) });
        }

        let mut done = Vec::new();
        let mut first_err = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, Ok(report))) => done.push((idx, report)),
                Ok((_, Err(e))) => {
                    first_err.get_or_insert(e);
                }
                Err(e) => {
                    first_err.get_or_insert(PipelineError::Other(anyhow!("parallel step aborted: {e}")));
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }
        done.sort_by_key(|(idx, _)| *idx);
        Ok(done.into_iter().flat_map(|(_, report)| report).collect())
    }
}
