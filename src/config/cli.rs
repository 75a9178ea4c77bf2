use crate::core::example::EXAMPLE_STATS_EXPORTER;
use crate::core::ConfigProvider;
use crate::domain::model::OutputFormat;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_bucket_boundaries, validate_non_empty_string, validate_positive_number,
    validate_range, Validate,
};
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "stats-exporter-host")]
#[command(about = "Runs the example stats exporter in a supervised background task")]
pub struct CliConfig {
    /// Number of latency samples to record
    #[arg(long, default_value = "100")]
    pub iterations: u64,

    /// Upper bound (exclusive) of the random latency in milliseconds
    #[arg(long, default_value = "20")]
    pub max_latency_ms: u64,

    #[arg(long, default_value = "1000")]
    pub export_interval_ms: u64,

    #[arg(long, default_value = EXAMPLE_STATS_EXPORTER)]
    pub span_name: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Seed for reproducible latency samples
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_delimiter = ',', default_value = "0,5,10,15,20")]
    pub latency_buckets: Vec<f64>,

    /// Load settings from a TOML file instead of the flags above
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ConfigProvider for CliConfig {
    fn export_interval(&self) -> Duration {
        Duration::from_millis(self.export_interval_ms)
    }

    fn span_name(&self) -> &str {
        &self.span_name
    }

    fn output_format(&self) -> OutputFormat {
        self.format
    }

    fn iterations(&self) -> u64 {
        self.iterations
    }

    fn max_latency_ms(&self) -> u64 {
        self.max_latency_ms
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn latency_buckets(&self) -> &[f64] {
        &self.latency_buckets
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("iterations", self.iterations, 1)?;
        validate_range("max_latency_ms", self.max_latency_ms, 1, 60_000)?;
        validate_positive_number("export_interval_ms", self.export_interval_ms, 1)?;
        validate_non_empty_string("span_name", &self.span_name)?;
        validate_bucket_boundaries("latency_buckets", &self.latency_buckets)?;
        Ok(())
    }
}
