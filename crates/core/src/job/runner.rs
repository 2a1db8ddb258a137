//! The single-active-job runner.
//!
//! At most one external job runs at a time. Starting a new job while one
//! is active terminates the old one first and marks it superseded: its
//! remaining output is dropped and its exit is reported with
//! `superseded = true`, so it can no longer touch the progress surface or
//! drive the task queue.
//!
//! On unix each job runs in its own process group and termination signals
//! the whole group, so wrapper scripts take their children down with them.
//!
//! A job counts as superseded only if the replacement was requested before
//! its exit was observed. The runner is driven from a single-threaded
//! runtime, so the exit report and the `on_exit` call that follows it
//! happen without another task interleaving.

use crate::job::error::JobError;
use crate::job::lines::line_stream;
use crate::job::JobSpec;
use lb_protocol::{ExitOutcome, Framing, JobExit, OutputStream};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio_stream::StreamExt;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Callbacks for one job.
///
/// Output callbacks run in the order the child produced the lines (per
/// stream). `on_exit` runs exactly once, after all output has been
/// delivered.
pub trait JobHandler: Send + 'static {
    fn on_stdout(&mut self, line: &str);
    fn on_stderr(&mut self, line: &str);
    fn on_exit(&mut self, exit: &JobExit);
}

/// Bookkeeping for the job currently owned by the runner.
struct ActiveJob {
    id: Uuid,
    superseded: Arc<AtomicBool>,
    kill_tx: oneshot::Sender<()>,
}

impl ActiveJob {
    /// Best-effort termination; the monitor logs a failed kill.
    fn terminate(self) {
        self.superseded.store(true, Ordering::SeqCst);
        if self.kill_tx.send(()).is_err() {
            debug!(job_id = %self.id, "job finished before termination was requested");
        }
    }
}

/// Handle returned by [`JobRunner::start`].
#[derive(Debug)]
pub struct JobHandle {
    id: Uuid,
    exit_rx: oneshot::Receiver<JobExit>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the job to exit.
    ///
    /// Resolves after the handler's `on_exit` has run and the runner has
    /// released the job, so a follow-up `start` never sees it as active.
    pub async fn wait(self) -> Result<JobExit, JobError> {
        let id = self.id;
        self.exit_rx.await.map_err(|_| JobError::MonitorLost(id))
    }
}

/// Owns at most one running external job.
///
/// Cloning is cheap; clones share the same active job.
#[derive(Clone, Default)]
pub struct JobRunner {
    active: Arc<Mutex<Option<ActiveJob>>>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `spec`, terminating the active job first if there is one.
    ///
    /// Once this returns `Ok`, exactly one job is active and only its
    /// handler receives output.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Spawn` if the process cannot be started. The
    /// previous job, if any, has already been terminated at that point.
    pub async fn start(
        &self,
        spec: JobSpec,
        handler: Box<dyn JobHandler>,
    ) -> Result<JobHandle, JobError> {
        let mut active = self.active.lock().await;

        if let Some(previous) = active.take() {
            info!(job_id = %previous.id, "terminating active job before starting a new one");
            previous.terminate();
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(
                spec.env
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| JobError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let stdout = child.stdout.take().ok_or(JobError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(JobError::MissingPipe("stderr"))?;

        let process_group = child.id();
        let id = Uuid::new_v4();
        let superseded = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        info!(job_id = %id, command = %spec, "job started");

        let monitor = JobMonitor {
            id,
            child,
            process_group,
            superseded: Arc::clone(&superseded),
            active: Arc::clone(&self.active),
            handler,
        };
        tokio::spawn(monitor.run(stdout, stderr, spec.framing, kill_rx, exit_tx));

        *active = Some(ActiveJob {
            id,
            superseded,
            kill_tx,
        });

        Ok(JobHandle { id, exit_rx })
    }

    /// Identifier of the active job, if any.
    pub async fn active_job(&self) -> Option<Uuid> {
        self.active.lock().await.as_ref().map(|job| job.id)
    }

    pub async fn is_running(&self) -> bool {
        self.active_job().await.is_some()
    }

    /// Terminate the active job without starting another.
    ///
    /// Returns `false` if nothing was running. The stopped job's exit is
    /// reported as superseded.
    pub async fn stop(&self) -> bool {
        match self.active.lock().await.take() {
            Some(job) => {
                info!(job_id = %job.id, "stopping active job");
                job.terminate();
                true
            }
            None => false,
        }
    }
}

/// Background task that pumps one job's output and reports its exit.
struct JobMonitor {
    id: Uuid,
    child: Child,
    /// Process group led by the child; equal to its pid.
    process_group: Option<u32>,
    superseded: Arc<AtomicBool>,
    active: Arc<Mutex<Option<ActiveJob>>>,
    handler: Box<dyn JobHandler>,
}

impl JobMonitor {
    async fn run(
        mut self,
        stdout: ChildStdout,
        stderr: ChildStderr,
        framing: Framing,
        mut kill_rx: oneshot::Receiver<()>,
        exit_tx: oneshot::Sender<JobExit>,
    ) {
        let stdout_lines = line_stream(stdout, framing).map(|line| (OutputStream::Stdout, line));
        let stderr_lines = line_stream(stderr, framing).map(|line| (OutputStream::Stderr, line));
        let mut output = stdout_lines.merge(stderr_lines);
        let mut kill_armed = true;

        loop {
            tokio::select! {
                next = output.next() => {
                    let Some((stream, line)) = next else {
                        break;
                    };
                    self.deliver(stream, &line);
                }
                request = &mut kill_rx, if kill_armed => {
                    kill_armed = false;
                    if request.is_ok() {
                        self.kill().await;
                    }
                }
            }
        }

        // Output can close long before the process exits, so keep honoring
        // termination while waiting.
        let mut kill_requested = false;
        let status = loop {
            tokio::select! {
                biased;
                status = self.child.wait() => break status,
                request = &mut kill_rx, if kill_armed => {
                    kill_armed = false;
                    kill_requested = request.is_ok();
                }
            }
            if kill_requested {
                kill_requested = false;
                self.kill().await;
            }
        };
        // Read together with the exit so that a replacement arriving later
        // does not relabel a natural exit.
        let superseded = self.superseded.load(Ordering::SeqCst);

        let outcome = match status {
            Ok(status) => ExitOutcome::from_code(status.code()),
            Err(e) => {
                warn!(job_id = %self.id, error = %e, "failed to wait for job");
                ExitOutcome::Terminated
            }
        };
        let exit = JobExit {
            job_id: self.id,
            outcome,
            superseded,
        };

        if exit.superseded {
            debug!(job_id = %self.id, ?outcome, "superseded job exited");
        } else if outcome.is_success() {
            info!(job_id = %self.id, "job finished");
        } else {
            warn!(job_id = %self.id, ?outcome, "job failed");
        }

        self.handler.on_exit(&exit);

        {
            let mut active = self.active.lock().await;
            if active.as_ref().is_some_and(|job| job.id == self.id) {
                *active = None;
            }
        }

        // The handle may have been dropped; nobody is waiting then.
        let _ = exit_tx.send(exit);
    }

    fn deliver(&mut self, stream: OutputStream, line: &str) {
        if self.superseded.load(Ordering::SeqCst) {
            trace!(job_id = %self.id, line, "dropping output of superseded job");
            return;
        }
        match stream {
            OutputStream::Stdout => self.handler.on_stdout(line),
            OutputStream::Stderr => self.handler.on_stderr(line),
        }
    }

    async fn kill(&mut self) {
        #[cfg(unix)]
        if let Some(group) = self.process_group {
            let target = format!("-{group}");
            let signalled = Command::new("kill")
                .args(["-KILL", "--", target.as_str()])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match signalled {
                Ok(status) if status.success() => {
                    debug!(job_id = %self.id, group, "kill signal sent to process group");
                    return;
                }
                Ok(status) => {
                    debug!(job_id = %self.id, group, %status, "process group kill failed");
                }
                Err(e) => {
                    warn!(job_id = %self.id, error = %e, "failed to run kill");
                }
            }
        }

        match self.child.start_kill() {
            Ok(()) => debug!(job_id = %self.id, "kill signal sent"),
            Err(e) => warn!(job_id = %self.id, error = %e, "failed to terminate job"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[derive(Debug, Clone, PartialEq)]
    enum Recorded {
        Stdout(String),
        Stderr(String),
        Exit(JobExit),
    }

    struct RecordingHandler(mpsc::UnboundedSender<Recorded>);

    impl JobHandler for RecordingHandler {
        fn on_stdout(&mut self, line: &str) {
            let _ = self.0.send(Recorded::Stdout(line.to_string()));
        }

        fn on_stderr(&mut self, line: &str) {
            let _ = self.0.send(Recorded::Stderr(line.to_string()));
        }

        fn on_exit(&mut self, exit: &JobExit) {
            let _ = self.0.send(Recorded::Exit(*exit));
        }
    }

    fn recorder() -> (Box<dyn JobHandler>, mpsc::UnboundedReceiver<Recorded>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Box::new(RecordingHandler(tx)), rx)
    }

    fn shell(script: &str) -> JobSpec {
        JobSpec::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Recorded>) -> Vec<Recorded> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_output_then_exit() {
        let runner = JobRunner::new();
        let (handler, mut rx) = recorder();

        let handle = runner
            .start(shell("echo one; echo two; echo oops >&2; exit 3"), handler)
            .await
            .unwrap();
        let exit = timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(exit.outcome, ExitOutcome::Failed(3));
        assert!(!exit.superseded);

        let events = drain(&mut rx);
        let stdout: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Recorded::Stdout(line) => Some(line.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, vec!["one", "two"]);
        assert!(events.contains(&Recorded::Stderr("oops".to_string())));
        assert_eq!(events.last(), Some(&Recorded::Exit(exit)));
        assert_eq!(
            events.iter().filter(|e| matches!(e, Recorded::Exit(_))).count(),
            1
        );

        assert!(!runner.is_running().await);
    }

    #[tokio::test]
    async fn test_successful_exit() {
        let runner = JobRunner::new();
        let (handler, _rx) = recorder();

        let handle = runner.start(shell("exit 0"), handler).await.unwrap();
        let exit = timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(exit.outcome, ExitOutcome::Success);
    }

    #[tokio::test]
    async fn test_env_is_passed_to_job() {
        let runner = JobRunner::new();
        let (handler, mut rx) = recorder();

        let spec = shell("echo \"host=$LB_TEST_HOST\"").with_env("LB_TEST_HOST", "gpu-box:11434");
        let handle = runner.start(spec, handler).await.unwrap();
        timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap()
            .unwrap();

        assert!(drain(&mut rx).contains(&Recorded::Stdout("host=gpu-box:11434".to_string())));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let runner = JobRunner::new();
        let (handler, _rx) = recorder();

        let result = runner
            .start(JobSpec::new("nonexistent-command-xyz", vec![]), handler)
            .await;

        assert!(matches!(result, Err(JobError::Spawn { ref program, .. }) if program == "nonexistent-command-xyz"));
        assert!(!runner.is_running().await);
    }

    #[tokio::test]
    async fn test_start_replaces_active_job() {
        let runner = JobRunner::new();
        let (first_handler, mut first_rx) = recorder();
        let (second_handler, mut second_rx) = recorder();

        let first = runner
            .start(JobSpec::new("sleep", vec!["5".to_string()]), first_handler)
            .await
            .unwrap();
        let first_id = first.id();
        assert_eq!(runner.active_job().await, Some(first_id));

        let second = runner
            .start(shell("echo replaced"), second_handler)
            .await
            .unwrap();
        let second_id = second.id();
        assert_ne!(first_id, second_id);

        let first_exit = timeout(Duration::from_secs(5), first.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(first_exit.superseded);
        assert!(!first_exit.outcome.is_success());

        let second_exit = timeout(Duration::from_secs(5), second.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!second_exit.superseded);
        assert_eq!(second_exit.outcome, ExitOutcome::Success);

        let first_events = drain(&mut first_rx);
        assert_eq!(first_events, vec![Recorded::Exit(first_exit)]);
        assert!(drain(&mut second_rx).contains(&Recorded::Stdout("replaced".to_string())));

        assert!(!runner.is_running().await);
    }

    #[tokio::test]
    async fn test_superseded_exit_does_not_clear_new_job() {
        let runner = JobRunner::new();
        let (first_handler, _first_rx) = recorder();
        let (second_handler, _second_rx) = recorder();

        let first = runner
            .start(JobSpec::new("sleep", vec!["5".to_string()]), first_handler)
            .await
            .unwrap();
        let second = runner
            .start(JobSpec::new("sleep", vec!["5".to_string()]), second_handler)
            .await
            .unwrap();

        timeout(Duration::from_secs(5), first.wait())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(runner.active_job().await, Some(second.id()));

        assert!(runner.stop().await);
        let exit = timeout(Duration::from_secs(5), second.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(exit.superseded);
        assert!(!runner.stop().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replace_kills_job_that_closed_its_output() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("finished");
        let runner = JobRunner::new();
        let (first_handler, _first_rx) = recorder();
        let (second_handler, _second_rx) = recorder();

        let script = format!(
            "exec >/dev/null 2>&1; sleep 1; touch '{}'",
            marker.display()
        );
        let first = runner.start(shell(&script), first_handler).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        runner.start(shell("exit 0"), second_handler).await.unwrap();

        let exit = timeout(Duration::from_millis(700), first.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(exit.superseded);
        assert!(!exit.outcome.is_success());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_whole_process_group() {
        let runner = JobRunner::new();
        let (handler, mut rx) = recorder();

        // The shell forks `sleep` and keeps the pipes open through it.
        let handle = runner.start(shell("sleep 5; echo done"), handler).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(runner.stop().await);
        let exit = timeout(Duration::from_secs(2), handle.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(exit.superseded);
        assert!(!drain(&mut rx).contains(&Recorded::Stdout("done".to_string())));
    }
}
