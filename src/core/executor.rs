use crate::utils::error::Result;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinError, JoinHandle};

pub type JobFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;
pub type Job = Box<dyn FnOnce(ShutdownSignal) -> JobFuture + Send + 'static>;

/// Cooperative cancellation seen by a running job.
///
/// If the owning [`TaskHandle`] is dropped without cancelling, the job keeps
/// running detached and `cancelled()` never resolves.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Returns the trigger side together with a signal listening to it.
    pub fn channel() -> (watch::Sender<bool>, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (tx, ShutdownSignal { rx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn cancelled(&mut self) {
        let closed = self.rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    Panicked(String),
    Aborted,
}

/// Cloneable view of a task's completion.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    rx: watch::Receiver<Option<TaskOutcome>>,
}

impl TaskCompletion {
    pub fn is_finished(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.rx.borrow().clone()
    }

    pub async fn wait(&self) -> TaskOutcome {
        let mut rx = self.rx.clone();
        let finished = rx.wait_for(Option::is_some).await.map(|done| done.clone());
        match finished {
            Ok(Some(outcome)) => outcome,
            _ => self.outcome().unwrap_or(TaskOutcome::Aborted),
        }
    }
}

pub struct TaskHandle {
    name: String,
    cancel_tx: watch::Sender<bool>,
    abort: AbortHandle,
    completion: TaskCompletion,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the job to stop; does not wait for it.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Stops the job at its next await point regardless of cooperation.
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_finished()
    }

    pub fn completion(&self) -> TaskCompletion {
        self.completion.clone()
    }

    pub async fn join(self) -> TaskOutcome {
        self.completion.wait().await
    }
}

pub trait TaskExecutor: Send + Sync {
    fn spawn(&self, name: &str, job: Job) -> TaskHandle;
}

/// Runs jobs on a tokio runtime. Every job gets a supervisor that turns its
/// result, error or panic into a [`TaskOutcome`] so failures stay on that task.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Panics outside of a tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TaskExecutor for TokioExecutor {
    fn spawn(&self, name: &str, job: Job) -> TaskHandle {
        let (cancel_tx, shutdown) = ShutdownSignal::channel();
        let (outcome_tx, outcome_rx) = watch::channel(None);

        let inner = self.handle.spawn(job(shutdown));
        let abort = inner.abort_handle();

        let task_name = name.to_string();
        self.handle.spawn(async move {
            let outcome = supervise(&task_name, inner).await;
            outcome_tx.send_replace(Some(outcome));
        });

        tracing::debug!("Spawned background task {}", name);

        TaskHandle {
            name: name.to_string(),
            cancel_tx,
            abort,
            completion: TaskCompletion { rx: outcome_rx },
        }
    }
}

async fn supervise(name: &str, inner: JoinHandle<Result<()>>) -> TaskOutcome {
    match inner.await {
        Ok(Ok(())) => {
            tracing::info!("✅ Background task {} completed", name);
            TaskOutcome::Completed
        }
        Ok(Err(e)) => {
            tracing::error!(
                "❌ Background task {} failed: {} (Category: {:?}, Severity: {:?})",
                name,
                e,
                e.category(),
                e.severity()
            );
            TaskOutcome::Failed(e.to_string())
        }
        Err(e) => join_error_outcome(name, e),
    }
}

fn join_error_outcome(name: &str, error: JoinError) -> TaskOutcome {
    if error.is_panic() {
        let message = panic_message(error.into_panic());
        tracing::error!("💥 Background task {} panicked: {}", name, message);
        TaskOutcome::Panicked(message)
    } else {
        tracing::warn!("Background task {} was aborted", name);
        TaskOutcome::Aborted
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ExporterError;
    use std::time::Duration;

    fn explode() -> Result<()> {
        panic!("exporter exploded")
    }

    fn job<F, Fut>(f: F) -> Job
    where
        F: FnOnce(ShutdownSignal) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Box::new(move |shutdown: ShutdownSignal| -> JobFuture { Box::pin(f(shutdown)) })
    }

    #[tokio::test]
    async fn test_completed_job() {
        let executor = TokioExecutor::current();
        let handle = executor.spawn("ok", job(|_| async { Ok(()) }));
        assert_eq!(handle.join().await, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_failed_job_is_reported_not_propagated() {
        let executor = TokioExecutor::current();
        let handle = executor.spawn(
            "fails",
            job(|_| async {
                Err(ExporterError::TaskError {
                    message: "boom".to_string(),
                })
            }),
        );
        assert_eq!(
            handle.join().await,
            TaskOutcome::Failed("Background task error: boom".to_string())
        );
    }

    #[tokio::test]
    async fn test_panicking_job_is_isolated() {
        let executor = TokioExecutor::current();
        let handle = executor.spawn("panics", job(|_| async { explode() }));
        assert_eq!(
            handle.join().await,
            TaskOutcome::Panicked("exporter exploded".to_string())
        );
    }

    #[tokio::test]
    async fn test_cancel_reaches_job() {
        let executor = TokioExecutor::current();
        let handle = executor.spawn(
            "waits",
            job(|mut shutdown| async move {
                shutdown.cancelled().await;
                Ok(())
            }),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(handle.join().await, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_abort_stops_uncooperative_job() {
        let executor = TokioExecutor::current();
        let handle = executor.spawn(
            "ignores_cancel",
            job(|_| async {
                std::future::pending::<()>().await;
                Ok(())
            }),
        );

        handle.abort();
        assert_eq!(handle.join().await, TaskOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_completion_can_be_awaited_from_clones() {
        let executor = TokioExecutor::current();
        let handle = executor.spawn("ok", job(|_| async { Ok(()) }));
        let completion = handle.completion();

        assert_eq!(completion.wait().await, TaskOutcome::Completed);
        assert_eq!(completion.wait().await, TaskOutcome::Completed);
        assert_eq!(completion.outcome(), Some(TaskOutcome::Completed));
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_dropped_handle_leaves_job_running() {
        let executor = TokioExecutor::current();
        let (finished_tx, finished_rx) = tokio::sync::oneshot::channel();

        let handle = executor.spawn(
            "detached",
            job(move |mut shutdown| async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tokio::time::sleep(Duration::from_millis(20)) => {
                        let _ = finished_tx.send(());
                    }
                }
                Ok(())
            }),
        );
        drop(handle);

        assert!(finished_rx.await.is_ok());
    }
}
