//! Queue behavior with real background work.

use anyhow::Result;
use async_trait::async_trait;
use lb_core::queue::{Completion, QueueError, Task, TaskOutcome, TaskQueue};
use lb_protocol::{QueueState, QueueStep, TaskKind};
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Default)]
struct Log(Vec<String>);

/// Finishes 20ms after it starts, from a spawned task.
struct Background(&'static str);

#[async_trait]
impl Task<Log> for Background {
    fn name(&self) -> &str {
        self.0
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Async
    }

    async fn run(&mut self, log: &mut Log) -> Result<TaskOutcome> {
        log.0.push(format!("{} started", self.0));
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(());
        });
        Ok(TaskOutcome::Pending(Completion::from_signal(rx)))
    }
}

struct Immediate(&'static str);

#[async_trait]
impl Task<Log> for Immediate {
    fn name(&self) -> &str {
        self.0
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Sync
    }

    async fn run(&mut self, log: &mut Log) -> Result<TaskOutcome> {
        log.0.push(format!("{} ran", self.0));
        Ok(TaskOutcome::Finished)
    }
}

/// Fails when it starts.
struct Broken;

#[async_trait]
impl Task<Log> for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Sync
    }

    async fn run(&mut self, _log: &mut Log) -> Result<TaskOutcome> {
        anyhow::bail!("broken task")
    }
}

fn queue() -> TaskQueue<Log> {
    TaskQueue::new(vec![
        Box::new(Background("download")),
        Box::new(Immediate("save")),
    ])
}

#[tokio::test(start_paused = true)]
async fn test_next_task_waits_for_background_completion() {
    let mut queue = queue();
    let mut log = Log::default();

    let step = queue.start(0, &mut log).await.unwrap();
    assert_eq!(step, QueueStep::Awaiting { index: 0 });
    assert_eq!(queue.state(), QueueState::Running);
    assert_eq!(queue.cursor(), 0);
    assert_eq!(log.0, vec!["download started"]);

    let step = queue.advance(&mut log).await.unwrap();
    assert_eq!(step, QueueStep::Ran { index: 1 });
    assert_eq!(queue.state(), QueueState::Complete);
    assert_eq!(log.0, vec!["download started", "save ran"]);

    // Completion is terminal.
    assert_eq!(queue.advance(&mut log).await.unwrap(), QueueStep::Complete);
    assert_eq!(log.0.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_from_last_index_skips_background_work() {
    let mut queue = queue();
    let mut log = Log::default();

    let last = queue.last_index();
    queue.run(last, &mut log).await.unwrap();

    assert_eq!(log.0, vec!["save ran"]);
    assert_eq!(queue.state(), QueueState::Complete);
}

#[tokio::test]
async fn test_failing_task_stops_the_queue() {
    let mut queue: TaskQueue<Log> =
        TaskQueue::new(vec![Box::new(Broken), Box::new(Immediate("after"))]);
    let mut log = Log::default();

    let err = queue.run(0, &mut log).await.unwrap_err();
    assert!(format!("{err:#}").contains("broken task"));
    assert!(log.0.is_empty());
    assert_eq!(queue.state(), QueueState::Failed);

    let err = queue.advance(&mut log).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<QueueError>(),
        Some(&QueueError::Failed { index: 0 })
    );
    assert!(log.0.is_empty());
    assert_eq!(queue.cursor(), 0);
}

/// Starts background work whose completion signal is dropped.
struct Abandoned;

#[async_trait]
impl Task<Log> for Abandoned {
    fn name(&self) -> &str {
        "abandoned"
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Async
    }

    async fn run(&mut self, log: &mut Log) -> Result<TaskOutcome> {
        log.0.push("abandoned started".to_string());
        let (tx, rx) = oneshot::channel();
        drop(tx);
        Ok(TaskOutcome::Pending(Completion::from_signal(rx)))
    }
}

#[tokio::test]
async fn test_failed_completion_never_reruns_its_task() {
    let mut queue: TaskQueue<Log> =
        TaskQueue::new(vec![Box::new(Abandoned), Box::new(Immediate("after"))]);
    let mut log = Log::default();

    assert_eq!(
        queue.start(0, &mut log).await.unwrap(),
        QueueStep::Awaiting { index: 0 }
    );

    let err = queue.advance(&mut log).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<QueueError>(),
        Some(&QueueError::SignalDropped)
    );
    assert_eq!(queue.state(), QueueState::Failed);

    for _ in 0..2 {
        let err = queue.advance(&mut log).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<QueueError>(),
            Some(&QueueError::Failed { index: 0 })
        );
    }
    assert_eq!(log.0, vec!["abandoned started"]);
    assert_eq!(queue.cursor(), 0);

    let err = queue.start(0, &mut log).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<QueueError>(),
        Some(&QueueError::AlreadyStarted)
    );
}
