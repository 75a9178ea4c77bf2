use crate::core::example::{DEFAULT_LATENCY_BUCKETS, EXAMPLE_STATS_EXPORTER};
use crate::core::ConfigProvider;
use crate::domain::model::OutputFormat;
use crate::utils::error::{ExporterError, Result};
use crate::utils::validation::{
    validate_bucket_boundaries, validate_non_empty_string, validate_positive_number,
    validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub exporter: ExporterConfig,
    pub workload: WorkloadConfig,
    pub views: ViewsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub interval_ms: u64,
    pub span_name: String,
    pub format: OutputFormat,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            span_name: EXAMPLE_STATS_EXPORTER.to_string(),
            format: OutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub iterations: u64,
    pub max_latency_ms: u64,
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            max_latency_ms: 20,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub latency_buckets: Vec<f64>,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            latency_buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ExporterError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ExporterError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ExporterError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_positive_number("exporter.interval_ms", self.exporter.interval_ms, 1)?;
        validate_non_empty_string("exporter.span_name", &self.exporter.span_name)?;
        validate_positive_number("workload.iterations", self.workload.iterations, 1)?;
        validate_range("workload.max_latency_ms", self.workload.max_latency_ms, 1, 60_000)?;
        validate_bucket_boundaries("views.latency_buckets", &self.views.latency_buckets)?;
        Ok(())
    }

    pub fn verbose(&self) -> bool {
        self.logging.verbose
    }
}

impl ConfigProvider for TomlConfig {
    fn export_interval(&self) -> Duration {
        Duration::from_millis(self.exporter.interval_ms)
    }

    fn span_name(&self) -> &str {
        &self.exporter.span_name
    }

    fn output_format(&self) -> OutputFormat {
        self.exporter.format
    }

    fn iterations(&self) -> u64 {
        self.workload.iterations
    }

    fn max_latency_ms(&self) -> u64 {
        self.workload.max_latency_ms
    }

    fn seed(&self) -> Option<u64> {
        self.workload.seed
    }

    fn latency_buckets(&self) -> &[f64] {
        &self.views.latency_buckets
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
