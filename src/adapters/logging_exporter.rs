use crate::domain::model::{Metric, OutputFormat, TimeSeries};
use crate::domain::ports::MetricExporter;
use crate::utils::error::{ExporterError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

const EXPORTER_NAME: &str = "LoggingExporter";

/// Writes every exported metric to the log, either as a readable report or
/// as one JSON document per metric.
#[derive(Debug, Default)]
pub struct LoggingExporter {
    format: OutputFormat,
    batches: AtomicU64,
}

impl LoggingExporter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            batches: AtomicU64::new(0),
        }
    }

    pub fn batches_exported(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MetricExporter for LoggingExporter {
    fn name(&self) -> &str {
        EXPORTER_NAME
    }

    async fn export(&self, metrics: &[Metric]) -> Result<()> {
        tracing::info!("📤 Exporting {} metrics", metrics.len());

        for metric in metrics {
            match self.format {
                OutputFormat::Text => {
                    for line in render_metric(metric)?.lines() {
                        tracing::info!("{}", line);
                    }
                }
                OutputFormat::Json => {
                    tracing::info!("{}", serde_json::to_string(metric)?);
                }
            }
        }

        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Human readable report for one metric: descriptor, label keys and a
/// `Seconds\tNanos\tValue` table per time series.
pub fn render_metric(metric: &Metric) -> Result<String> {
    let descriptor = &metric.descriptor;
    let mut out = String::new();

    out.push_str(&format!(
        "Name: {}, type: {}\n",
        descriptor.name, descriptor.kind
    ));

    let keys: Vec<&str> = descriptor
        .label_keys
        .iter()
        .map(|k| k.key.as_str())
        .collect();
    out.push_str(&format!("Keys: {}\n", keys.join(" ")));

    for series in &metric.time_series {
        match &series.start_timestamp {
            Some(start) => out.push_str(&format!("Start: {}\n", start)),
            None => out.push_str("Start: -\n"),
        }
        let values: Vec<String> = series.label_values.iter().map(|v| v.to_string()).collect();
        out.push_str(&format!("Label values: {}\n", values.join(" ")));
        out.push_str(&render_points(series)?);
    }

    Ok(out)
}

fn render_points(series: &TimeSeries) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(["Seconds", "Nanos", "Value"])?;
    for point in &series.points {
        writer.write_record([
            point.timestamp.seconds.to_string(),
            point.timestamp.nanos.to_string(),
            point.value.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| ExporterError::ExportError {
        exporter: EXPORTER_NAME.to_string(),
        message: e.error().to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| ExporterError::ExportError {
        exporter: EXPORTER_NAME.to_string(),
        message: e.to_string(),
    })
}
