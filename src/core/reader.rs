use crate::domain::model::Metric;
use crate::domain::ports::{MetricExporter, MetricProducer};
use crate::utils::error::{ExporterError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;

pub const DEFAULT_EXPORT_INTERVAL: Duration = Duration::from_secs(60);

/// The set of producers a reader pulls metrics from.
#[derive(Clone, Default)]
pub struct MetricProducerManager {
    producers: Arc<Mutex<Vec<Arc<dyn MetricProducer>>>>,
}

impl MetricProducerManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn MetricProducer>>> {
        self.producers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, producer: Arc<dyn MetricProducer>) {
        let mut producers = self.lock();
        if !producers.iter().any(|p| Arc::ptr_eq(p, &producer)) {
            producers.push(producer);
        }
    }

    pub fn remove(&self, producer: &Arc<dyn MetricProducer>) {
        self.lock().retain(|p| !Arc::ptr_eq(p, producer));
    }

    pub fn producers(&self) -> Vec<Arc<dyn MetricProducer>> {
        self.lock().clone()
    }
}

pub struct MetricReader {
    producer_manager: MetricProducerManager,
    span_name: String,
}

impl MetricReader {
    pub fn new(producer_manager: MetricProducerManager, span_name: impl Into<String>) -> Self {
        Self {
            producer_manager,
            span_name: span_name.into(),
        }
    }

    pub fn span_name(&self) -> &str {
        &self.span_name
    }

    /// Reads every producer once and hands the batch to `exporter`.
    pub async fn read_and_export(&self, exporter: &dyn MetricExporter) -> Result<()> {
        let span = tracing::info_span!("read_and_export", span_name = %self.span_name);
        async {
            let metrics: Vec<Metric> = self
                .producer_manager
                .producers()
                .iter()
                .flat_map(|producer| producer.produce_metrics())
                .collect();

            tracing::debug!(
                "Read {} metrics, exporting via {}",
                metrics.len(),
                exporter.name()
            );

            exporter.export(&metrics).await.map_err(|e| {
                tracing::warn!("⚠️ Export via {} failed: {}", exporter.name(), e);
                e
            })
        }
        .instrument(span)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct IntervalMetricReaderOptions {
    pub export_interval: Duration,
}

impl Default for IntervalMetricReaderOptions {
    fn default() -> Self {
        Self {
            export_interval: DEFAULT_EXPORT_INTERVAL,
        }
    }
}

/// Exports on a fixed interval in a background task until stopped, then
/// exports one last time.
pub struct IntervalMetricReader {
    reader: Arc<MetricReader>,
    exporter: Arc<dyn MetricExporter>,
    stop_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl IntervalMetricReader {
    /// Must be called from within a tokio runtime.
    pub fn create(
        exporter: Arc<dyn MetricExporter>,
        reader: MetricReader,
        options: IntervalMetricReaderOptions,
    ) -> Result<Self> {
        let period = options.export_interval;
        if period.is_zero() {
            return Err(ExporterError::InvalidConfigValueError {
                field: "export_interval".to_string(),
                value: format!("{:?}", period),
                reason: "Export interval must be greater than zero".to_string(),
            });
        }

        let reader = Arc::new(reader);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let worker_reader = Arc::clone(&reader);
        let worker_exporter = Arc::clone(&exporter);
        let worker = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // fires on stop() and when the reader is dropped
                    _ = &mut stop_rx => {
                        tracing::debug!("Interval reader stopping, running final export");
                        return worker_reader.read_and_export(worker_exporter.as_ref()).await;
                    }
                    _ = ticker.tick() => {
                        // failures are already logged; keep exporting on schedule
                        let _ = worker_reader.read_and_export(worker_exporter.as_ref()).await;
                    }
                }
            }
        });

        tracing::info!(
            "⏱️ Interval metric reader started ({} every {:?})",
            reader.span_name(),
            period
        );

        Ok(Self {
            reader,
            exporter,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Forces an export outside the regular schedule.
    pub async fn read_now(&self) -> Result<()> {
        self.reader.read_and_export(self.exporter.as_ref()).await
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.await {
            Ok(result) => result,
            Err(e) => Err(ExporterError::TaskError {
                message: format!("interval reader task failed: {}", e),
            }),
        }
    }
}

impl Drop for IntervalMetricReader {
    fn drop(&mut self) {
        // dropping the sender wakes the worker for its final export
        self.stop_tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stats::Stats;
    use crate::domain::model::{Aggregation, Measure, View};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExporter {
        batches: AtomicUsize,
        last_batch_len: AtomicUsize,
    }

    #[async_trait]
    impl MetricExporter for CountingExporter {
        async fn export(&self, metrics: &[Metric]) -> Result<()> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.last_batch_len.store(metrics.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingExporter;

    #[async_trait]
    impl MetricExporter for FailingExporter {
        fn name(&self) -> &str {
            "FailingExporter"
        }

        async fn export(&self, _metrics: &[Metric]) -> Result<()> {
            Err(ExporterError::ExportError {
                exporter: "FailingExporter".to_string(),
                message: "backend unavailable".to_string(),
            })
        }
    }

    fn stats_with_data() -> Stats {
        let stats = Stats::new();
        let measure = Measure::long("test/requests", "requests", "1");
        stats
            .view_manager()
            .register_view(View::new("requests", "", measure.clone(), Aggregation::Count, vec![]))
            .unwrap();
        stats.recorder().new_measure_map().put_long(&measure, 1).record();
        stats
    }

    #[tokio::test]
    async fn test_read_and_export_collects_all_producers() {
        let stats = stats_with_data();
        let reader = MetricReader::new(stats.producer_manager().clone(), "test");
        let exporter = CountingExporter::default();

        reader.read_and_export(&exporter).await.unwrap();

        assert_eq!(exporter.batches.load(Ordering::SeqCst), 1);
        assert_eq!(exporter.last_batch_len.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_and_export_propagates_exporter_error() {
        let stats = stats_with_data();
        let reader = MetricReader::new(stats.producer_manager().clone(), "test");

        let err = reader.read_and_export(&FailingExporter).await.unwrap_err();
        assert!(matches!(err, ExporterError::ExportError { .. }));
    }

    #[test]
    fn test_producer_manager_deduplicates_and_removes() {
        let stats = Stats::new();
        let manager = MetricProducerManager::new();
        let producer: Arc<dyn MetricProducer> = Arc::new(stats.view_manager().clone());

        manager.add(Arc::clone(&producer));
        manager.add(Arc::clone(&producer));
        assert_eq!(manager.producers().len(), 1);

        manager.remove(&producer);
        assert!(manager.producers().is_empty());
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let stats = Stats::new();
        let reader = MetricReader::new(stats.producer_manager().clone(), "test");
        let result = IntervalMetricReader::create(
            Arc::new(CountingExporter::default()),
            reader,
            IntervalMetricReaderOptions {
                export_interval: Duration::ZERO,
            },
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_interval_reader_exports_periodically_and_on_stop() {
        let stats = stats_with_data();
        let exporter = Arc::new(CountingExporter::default());
        let reader = MetricReader::new(stats.producer_manager().clone(), "test");

        let interval_reader = IntervalMetricReader::create(
            exporter.clone(),
            reader,
            IntervalMetricReaderOptions {
                export_interval: Duration::from_millis(10),
            },
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let periodic = exporter.batches.load(Ordering::SeqCst);
        assert!(periodic >= 2, "expected periodic exports, got {}", periodic);

        interval_reader.stop().await.unwrap();
        assert!(exporter.batches.load(Ordering::SeqCst) > periodic);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick_still_exports_once() {
        let stats = stats_with_data();
        let exporter = Arc::new(CountingExporter::default());
        let reader = MetricReader::new(stats.producer_manager().clone(), "test");

        let interval_reader = IntervalMetricReader::create(
            exporter.clone(),
            reader,
            IntervalMetricReaderOptions::default(),
        )
        .unwrap();
        interval_reader.read_now().await.unwrap();
        interval_reader.stop().await.unwrap();

        assert_eq!(exporter.batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_surfaces_final_export_error() {
        let stats = stats_with_data();
        let reader = MetricReader::new(stats.producer_manager().clone(), "test");
        let interval_reader = IntervalMetricReader::create(
            Arc::new(FailingExporter),
            reader,
            IntervalMetricReaderOptions::default(),
        )
        .unwrap();

        assert!(interval_reader.stop().await.is_err());
    }
}
