//! Sequential task queue.
//!
//! Tasks run strictly one after another. A synchronous task finishes inside
//! its `run` call; an asynchronous task starts background work and returns
//! a [`Completion`] that the queue awaits before it moves on, so the next
//! task never starts while the previous one is still finishing.
//!
//! ```text
//! Idle --start(at)--> Running --advance()...--> Complete
//!                        |
//!                        +--task error--> Failed
//! ```

use anyhow::Result;
use async_trait::async_trait;
use lb_protocol::{QueueState, QueueStep, TaskKind};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Errors raised by the queue itself, as opposed to by its tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Task queue has not been started")]
    NotStarted,

    #[error("Task queue has already been started")]
    AlreadyStarted,

    #[error("Cannot start task queue at index {index}, it has {len} tasks")]
    StartOutOfRange { index: usize, len: usize },

    #[error("Completion signal was dropped before the task finished")]
    SignalDropped,

    #[error("Task queue stopped after task {index} failed")]
    Failed { index: usize },
}

/// The continuation of an asynchronous task.
pub struct Completion {
    inner: Pin<Box<dyn Future<Output = Result<()>> + Send>>,
}

impl Completion {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            inner: Box::pin(future),
        }
    }

    /// Complete when `signal` fires.
    pub fn from_signal(signal: oneshot::Receiver<()>) -> Self {
        Self::new(async move {
            signal
                .await
                .map_err(|_| anyhow::Error::from(QueueError::SignalDropped))
        })
    }

    pub async fn wait(self) -> Result<()> {
        self.inner.await
    }
}

/// What running a task produced.
pub enum TaskOutcome {
    /// The task is done; the queue may move on.
    Finished,

    /// Background work is in flight; the queue moves on once it completes.
    Pending(Completion),
}

/// One step of a queue operating on a shared context `C`.
#[async_trait]
pub trait Task<C: Send>: Send {
    fn name(&self) -> &str;

    fn kind(&self) -> TaskKind;

    async fn run(&mut self, ctx: &mut C) -> Result<TaskOutcome>;
}

/// Ordered tasks with a cursor that only moves forward.
pub struct TaskQueue<C: Send> {
    tasks: Vec<Box<dyn Task<C>>>,
    cursor: usize,
    state: QueueState,
    pending: Option<Completion>,
}

impl<C: Send> TaskQueue<C> {
    pub fn new(tasks: Vec<Box<dyn Task<C>>>) -> Self {
        Self {
            tasks,
            cursor: 0,
            state: QueueState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Index of the next task to run.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Index of the final task; starting there runs only that task.
    pub fn last_index(&self) -> usize {
        self.tasks.len().saturating_sub(1)
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    /// Move from Idle to Running at `index` and run the task there.
    ///
    /// Starting at `len()` is allowed and completes immediately.
    pub async fn start(&mut self, index: usize, ctx: &mut C) -> Result<QueueStep> {
        if self.state != QueueState::Idle {
            return Err(QueueError::AlreadyStarted.into());
        }
        if index > self.tasks.len() {
            return Err(QueueError::StartOutOfRange {
                index,
                len: self.tasks.len(),
            }
            .into());
        }

        info!(start = index, tasks = self.tasks.len(), "task queue started");
        self.cursor = index;
        self.state = QueueState::Running;
        if self.cursor == self.tasks.len() {
            self.finish();
            return Ok(QueueStep::Complete);
        }

        self.advance(ctx).await
    }

    /// Run the next step.
    ///
    /// If the previous task is asynchronous, wait for its completion first
    /// and step past it. Once the queue is Complete, further calls do
    /// nothing. A failing task or completion moves the queue to Failed,
    /// after which every call errors without running anything.
    pub async fn advance(&mut self, ctx: &mut C) -> Result<QueueStep> {
        match self.state {
            QueueState::Idle => return Err(QueueError::NotStarted.into()),
            QueueState::Complete => {
                debug!("advance on a completed task queue ignored");
                return Ok(QueueStep::Complete);
            }
            QueueState::Failed => {
                return Err(QueueError::Failed {
                    index: self.cursor,
                }
                .into());
            }
            QueueState::Running => {}
        }

        if let Some(completion) = self.pending.take() {
            let name = self.tasks[self.cursor].name().to_string();
            if let Err(e) = completion.wait().await {
                self.fail();
                return Err(e.context(format!("task '{name}' did not complete")));
            }
            debug!(task = %name, index = self.cursor, "asynchronous task completed");
            self.step_past();
            if self.state == QueueState::Complete {
                return Ok(QueueStep::Complete);
            }
        }

        let index = self.cursor;
        let task = &mut self.tasks[index];
        let name = task.name().to_string();
        debug!(task = %name, index, kind = ?task.kind(), "running task");

        let outcome = match task.run(ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.fail();
                return Err(e.context(format!("task '{name}' failed")));
            }
        };

        match outcome {
            TaskOutcome::Finished => {
                self.step_past();
                Ok(QueueStep::Ran { index })
            }
            TaskOutcome::Pending(completion) => {
                self.pending = Some(completion);
                Ok(QueueStep::Awaiting { index })
            }
        }
    }

    /// Start at `index` and advance until Complete.
    pub async fn run(&mut self, index: usize, ctx: &mut C) -> Result<()> {
        self.start(index, ctx).await?;
        while self.state != QueueState::Complete {
            self.advance(ctx).await?;
        }
        Ok(())
    }

    fn step_past(&mut self) {
        self.cursor += 1;
        if self.cursor >= self.tasks.len() {
            self.finish();
        }
    }

    fn fail(&mut self) {
        self.state = QueueState::Failed;
        warn!(index = self.cursor, "task queue failed");
    }

    fn finish(&mut self) {
        self.state = QueueState::Complete;
        info!("task queue complete");
    }
}
