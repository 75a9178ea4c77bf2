pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{ConsoleSurface, LoggingExporter};
pub use core::{
    example::{ExampleStatsExporter, ExampleWorkload, WorkloadSettings},
    executor::{ShutdownSignal, TaskExecutor, TaskHandle, TaskOutcome, TokioExecutor},
    host::ExporterHost,
    stats::Stats,
};
pub use utils::error::{ExporterError, Result};
