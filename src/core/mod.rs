pub mod example;
pub mod executor;
pub mod host;
pub mod reader;
pub mod stats;

pub use crate::domain::model::{Layout, Measure, Metric, View};
pub use crate::domain::ports::{ConfigProvider, ContentSurface, ExporterTask, MetricExporter};
pub use crate::utils::error::Result;
