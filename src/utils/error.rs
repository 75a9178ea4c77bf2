use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Table rendering error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid bucket boundaries: {reason}")]
    InvalidBucketBoundaries { reason: String },

    #[error("A different view with the same name is already registered: {name}")]
    ViewConflict { name: String },

    #[error("Export failed in {exporter}: {message}")]
    ExportError { exporter: String, message: String },

    #[error("Lifecycle error: {message}")]
    LifecycleError { message: String },

    #[error("Background task error: {message}")]
    TaskError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Stats,
    Export,
    Lifecycle,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExporterError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExporterError::ConfigError { .. }
            | ExporterError::ConfigValidationError { .. }
            | ExporterError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            ExporterError::InvalidBucketBoundaries { .. } | ExporterError::ViewConflict { .. } => {
                ErrorCategory::Stats
            }
            ExporterError::ExportError { .. }
            | ExporterError::SerializationError(_)
            | ExporterError::CsvError(_) => ErrorCategory::Export,
            ExporterError::LifecycleError { .. } | ExporterError::TaskError { .. } => {
                ErrorCategory::Lifecycle
            }
            ExporterError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Export => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Stats => ErrorSeverity::High,
            ErrorCategory::Lifecycle => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the command line flags or the TOML config file",
            ErrorCategory::Stats => {
                "Use strictly increasing bucket boundaries and unique view names"
            }
            ErrorCategory::Export => "The next export interval will retry; check exporter output",
            ErrorCategory::Lifecycle => "Destroy the host before creating it again",
            ErrorCategory::System => "Check file permissions and available resources",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ExporterError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            ExporterError::ConfigValidationError { field, message } => {
                format!("Could not read setting '{}': {}", field, message)
            }
            ExporterError::ViewConflict { name } => {
                format!("View '{}' is already registered with a different definition", name)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
