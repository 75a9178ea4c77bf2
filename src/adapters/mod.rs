// Adapters layer: concrete implementations of the domain ports.

pub mod logging_exporter;
pub mod surface;

pub use logging_exporter::LoggingExporter;
pub use surface::ConsoleSurface;
