use crate::core::executor::ShutdownSignal;
use crate::core::reader::{IntervalMetricReader, IntervalMetricReaderOptions, MetricReader};
use crate::core::stats::Stats;
use crate::domain::model::{Aggregation, BucketBoundaries, Measure, OutputFormat, View};
use crate::domain::ports::{ConfigProvider, ExporterTask, MetricExporter};
use crate::utils::error::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

pub const EXAMPLE_STATS_EXPORTER: &str = "ExampleStatsExporter";
pub const LATENCY_MEASURE_NAME: &str = "example/latency";
pub const LATENCY_VIEW_NAME: &str = "ocjavaexporter/latency";
pub const DEFAULT_LATENCY_BUCKETS: [f64; 5] = [0.0, 5.0, 10.0, 15.0, 20.0];

pub fn latency_measure() -> Measure {
    Measure::long(LATENCY_MEASURE_NAME, "A measure to test the exporter", "ms")
}

/// Registers the latency distribution view. Safe to call more than once.
pub fn register_all_views(stats: &Stats, latency_buckets: &[f64]) -> Result<()> {
    let boundaries = BucketBoundaries::new(latency_buckets.to_vec())?;
    let views = [View::new(
        LATENCY_VIEW_NAME,
        "The distribution of latencies",
        latency_measure(),
        Aggregation::Distribution(boundaries),
        Vec::new(),
    )];

    for view in views {
        stats.view_manager().register_view(view)?;
    }
    Ok(())
}

/// Periodically exports everything the stats producers know about.
pub struct ExampleStatsExporter {
    interval_reader: IntervalMetricReader,
}

impl ExampleStatsExporter {
    pub fn create_and_register(
        stats: &Stats,
        exporter: Arc<dyn MetricExporter>,
        export_interval: Duration,
        span_name: &str,
    ) -> Result<Self> {
        let reader = MetricReader::new(stats.producer_manager().clone(), span_name);
        let interval_reader = IntervalMetricReader::create(
            exporter,
            reader,
            IntervalMetricReaderOptions { export_interval },
        )?;
        Ok(Self { interval_reader })
    }

    pub async fn read_now(&self) -> Result<()> {
        self.interval_reader.read_now().await
    }

    /// Stops the schedule after one final export.
    pub async fn stop(self) -> Result<()> {
        self.interval_reader.stop().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSettings {
    pub iterations: u64,
    pub max_latency_ms: u64,
    pub seed: Option<u64>,
    pub export_interval: Duration,
    pub span_name: String,
    pub output_format: OutputFormat,
    pub latency_buckets: Vec<f64>,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            max_latency_ms: 20,
            seed: None,
            export_interval: Duration::from_secs(1),
            span_name: EXAMPLE_STATS_EXPORTER.to_string(),
            output_format: OutputFormat::Text,
            latency_buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
        }
    }
}

impl WorkloadSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            iterations: config.iterations(),
            max_latency_ms: config.max_latency_ms(),
            seed: config.seed(),
            export_interval: config.export_interval(),
            span_name: config.span_name().to_string(),
            output_format: config.output_format(),
            latency_buckets: config.latency_buckets().to_vec(),
        }
    }
}

/// Registers the example exporter and views, then records random latencies
/// until the configured number of samples is reached or it is cancelled.
pub struct ExampleWorkload {
    stats: Stats,
    exporter: Arc<dyn MetricExporter>,
    settings: WorkloadSettings,
}

impl ExampleWorkload {
    pub fn new(
        stats: Stats,
        exporter: Arc<dyn MetricExporter>,
        settings: WorkloadSettings,
    ) -> Self {
        Self {
            stats,
            exporter,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkloadSettings {
        &self.settings
    }
}

#[async_trait]
impl ExporterTask for ExampleWorkload {
    async fn register_and_run(&self, mut shutdown: ShutdownSignal) -> Result<()> {
        let settings = &self.settings;
        let exporter = ExampleStatsExporter::create_and_register(
            &self.stats,
            Arc::clone(&self.exporter),
            settings.export_interval,
            &settings.span_name,
        )?;
        register_all_views(&self.stats, &settings.latency_buckets)?;

        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let measure = latency_measure();
        let recorder = self.stats.recorder();

        tracing::info!(
            "Recording {} latency samples (max {}ms)",
            settings.iterations,
            settings.max_latency_ms
        );

        for i in 0..settings.iterations {
            if shutdown.is_cancelled() {
                tracing::info!(
                    "Cancelled after {} of {} samples",
                    i,
                    settings.iterations
                );
                break;
            }

            let latency = if settings.max_latency_ms == 0 {
                0
            } else {
                rng.gen_range(0..settings.max_latency_ms)
            };
            recorder
                .new_measure_map()
                .put_long(&measure, latency as i64)
                .record();

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!(
                        "Got a cancellation after {} of {} samples",
                        i + 1,
                        settings.iterations
                    );
                    break;
                }
                _ = tokio::time::sleep(Duration::from_millis(latency)) => {}
            }
        }

        exporter.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Metric, Value};
    use crate::domain::ports::MetricProducer;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingExporter {
        batches: Mutex<Vec<Vec<Metric>>>,
    }

    #[async_trait]
    impl MetricExporter for RecordingExporter {
        async fn export(&self, metrics: &[Metric]) -> Result<()> {
            self.batches.lock().unwrap().push(metrics.to_vec());
            Ok(())
        }
    }

    fn fast_settings(iterations: u64) -> WorkloadSettings {
        WorkloadSettings {
            iterations,
            max_latency_ms: 3,
            seed: Some(7),
            export_interval: Duration::from_secs(60),
            ..WorkloadSettings::default()
        }
    }

    fn sample_count(metrics: &[Metric]) -> u64 {
        let metric = metrics
            .iter()
            .find(|m| m.descriptor.name == LATENCY_VIEW_NAME)
            .expect("latency metric exported");
        match &metric.time_series[0].points[0].value {
            Value::Distribution(dist) => dist.count,
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_register_all_views_is_idempotent() {
        let stats = Stats::new();
        register_all_views(&stats, &DEFAULT_LATENCY_BUCKETS).unwrap();
        register_all_views(&stats, &DEFAULT_LATENCY_BUCKETS).unwrap();

        let view = stats.view_manager().get_view(LATENCY_VIEW_NAME).unwrap();
        assert_eq!(view.measure.name, LATENCY_MEASURE_NAME);
        assert_eq!(view.measure.unit, "ms");
        assert!(view.columns.is_empty());
    }

    #[test]
    fn test_register_all_views_rejects_changed_buckets() {
        let stats = Stats::new();
        register_all_views(&stats, &DEFAULT_LATENCY_BUCKETS).unwrap();
        assert!(register_all_views(&stats, &[1.0, 2.0]).is_err());
    }

    #[tokio::test]
    async fn test_workload_records_every_sample_and_exports_on_stop() {
        let stats = Stats::new();
        let exporter = Arc::new(RecordingExporter::default());
        let workload = ExampleWorkload::new(stats.clone(), exporter.clone(), fast_settings(10));

        let (_tx, shutdown) = ShutdownSignal::channel();
        workload.register_and_run(shutdown).await.unwrap();

        let batches = exporter.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(sample_count(&batches[0]), 10);
    }

    #[tokio::test]
    async fn test_workload_samples_stay_below_max_latency() {
        let stats = Stats::new();
        let exporter = Arc::new(RecordingExporter::default());
        let workload = ExampleWorkload::new(stats.clone(), exporter, fast_settings(20));

        let (_tx, shutdown) = ShutdownSignal::channel();
        workload.register_and_run(shutdown).await.unwrap();

        let metrics = stats.view_manager().produce_metrics();
        let Value::Distribution(dist) = &metrics[0].time_series[0].points[0].value else {
            panic!("expected a distribution");
        };
        // max latency 3ms => everything lands in [0, 5)
        assert_eq!(dist.buckets, vec![0, 20, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_cancelled_workload_stops_early_and_still_exports() {
        let stats = Stats::new();
        let exporter = Arc::new(RecordingExporter::default());
        let settings = WorkloadSettings {
            iterations: 10_000,
            max_latency_ms: 20,
            ..fast_settings(0)
        };
        let workload = ExampleWorkload::new(stats.clone(), exporter.clone(), settings);

        let (tx, shutdown) = ShutdownSignal::channel();
        let run = tokio::spawn(async move { workload.register_and_run(shutdown).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send_replace(true);
        run.await.unwrap().unwrap();

        let batches = exporter.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let recorded = sample_count(&batches[0]);
        assert!(recorded >= 1 && recorded < 10_000);
    }

    #[tokio::test]
    async fn test_pre_cancelled_workload_records_nothing() {
        let stats = Stats::new();
        let exporter = Arc::new(RecordingExporter::default());
        let settings = WorkloadSettings {
            max_latency_ms: 0,
            ..fast_settings(50)
        };
        let workload = ExampleWorkload::new(stats.clone(), exporter.clone(), settings);

        let (tx, shutdown) = ShutdownSignal::channel();
        tx.send_replace(true);
        workload.register_and_run(shutdown).await.unwrap();

        // the reader is still stopped, so the final export sees no data
        let batches = exporter.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_empty());
        assert!(stats.view_manager().produce_metrics().is_empty());
    }
}
