use crate::core::executor::{JobFuture, ShutdownSignal, TaskExecutor, TaskHandle};
use crate::domain::model::Layout;
use crate::domain::ports::{ContentSurface, ExporterTask};
use crate::utils::error::{ExporterError, Result};
use std::sync::Arc;

/// Lifecycle owner for the background exporter.
///
/// Each creation renders the layout once and submits exactly one task that
/// calls [`ExporterTask::register_and_run`]. Destruction only signals
/// cancellation; it never waits on the task, and a failing task never
/// reaches the host.
pub struct ExporterHost {
    surface: Arc<dyn ContentSurface>,
    executor: Arc<dyn TaskExecutor>,
    exporter: Arc<dyn ExporterTask>,
    layout: Layout,
    current: Option<TaskHandle>,
    creations: u64,
}

impl ExporterHost {
    pub fn new(
        surface: Arc<dyn ContentSurface>,
        executor: Arc<dyn TaskExecutor>,
        exporter: Arc<dyn ExporterTask>,
    ) -> Self {
        Self {
            surface,
            executor,
            exporter,
            layout: Layout::activity_main(),
            current: None,
            creations: 0,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn on_create(&mut self) -> Result<()> {
        if self.current.is_some() {
            return Err(ExporterError::LifecycleError {
                message: "host is already created; call on_destroy first".to_string(),
            });
        }

        self.surface.set_content(&self.layout);
        self.creations += 1;

        let exporter = Arc::clone(&self.exporter);
        let name = format!("exporter-{}", self.creations);
        let handle = self.executor.spawn(
            &name,
            Box::new(move |shutdown: ShutdownSignal| -> JobFuture {
                Box::pin(async move { exporter.register_and_run(shutdown).await })
            }),
        );

        tracing::info!("🚀 Host created, background task {} submitted", handle.name());
        self.current = Some(handle);
        Ok(())
    }

    /// Signals cancellation to the running task and hands its handle back so
    /// the caller can decide whether to wait for it.
    pub fn on_destroy(&mut self) -> Option<TaskHandle> {
        let handle = self.current.take()?;
        handle.cancel();
        tracing::info!("🛑 Host destroyed, cancellation sent to {}", handle.name());
        Some(handle)
    }

    /// Configuration change: tear down and create again without waiting for
    /// the previous task.
    pub fn recreate(&mut self) -> Result<Option<TaskHandle>> {
        let previous = self.on_destroy();
        self.on_create()?;
        Ok(previous)
    }

    pub fn is_created(&self) -> bool {
        self.current.is_some()
    }

    pub fn task(&self) -> Option<&TaskHandle> {
        self.current.as_ref()
    }

    pub fn creations(&self) -> u64 {
        self.creations
    }
}

impl Drop for ExporterHost {
    fn drop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }
}
