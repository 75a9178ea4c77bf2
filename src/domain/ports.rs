use crate::core::executor::ShutdownSignal;
use crate::domain::model::{Layout, Metric, OutputFormat};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Receives batches of metrics read from the registered producers.
#[async_trait]
pub trait MetricExporter: Send + Sync {
    fn name(&self) -> &str {
        "MetricExporter"
    }

    async fn export(&self, metrics: &[Metric]) -> Result<()>;
}

/// Source of metrics for a reader, e.g. the view manager.
pub trait MetricProducer: Send + Sync {
    fn produce_metrics(&self) -> Vec<Metric>;
}

/// The single entry point the host launches in the background on creation.
#[async_trait]
pub trait ExporterTask: Send + Sync {
    async fn register_and_run(&self, shutdown: ShutdownSignal) -> Result<()>;
}

/// Where the host renders its static layout.
pub trait ContentSurface: Send + Sync {
    fn set_content(&self, layout: &Layout);
}

pub trait ConfigProvider: Send + Sync {
    fn export_interval(&self) -> Duration;
    fn span_name(&self) -> &str;
    fn output_format(&self) -> OutputFormat;
    fn iterations(&self) -> u64;
    fn max_latency_ms(&self) -> u64;
    fn seed(&self) -> Option<u64>;
    fn latency_buckets(&self) -> &[f64];
}
