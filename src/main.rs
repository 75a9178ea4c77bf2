use clap::Parser;
use stats_exporter_host::domain::model::OutputFormat;
use stats_exporter_host::utils::error::ErrorSeverity;
use stats_exporter_host::utils::{logger, validation::Validate};
use stats_exporter_host::{
    CliConfig, ConsoleSurface, ExampleWorkload, ExporterError, ExporterHost, LoggingExporter,
    Stats, TaskOutcome, TokioExecutor, TomlConfig, WorkloadSettings,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // settings come from the TOML file when one is given, otherwise from flags
    let (settings, verbose) = match &cli.config {
        Some(path) => {
            let config = match TomlConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(1);
                }
            };
            exit_on_invalid(&config);
            (
                WorkloadSettings::from_config(&config),
                cli.verbose || config.verbose(),
            )
        }
        None => {
            exit_on_invalid(&cli);
            (WorkloadSettings::from_config(&cli), cli.verbose)
        }
    };

    match settings.output_format {
        OutputFormat::Json => logger::init_json_logger(verbose),
        OutputFormat::Text => logger::init_cli_logger(verbose),
    }

    tracing::info!("Starting stats-exporter-host");
    tracing::debug!("Workload settings: {:?}", settings);

    let stats = Stats::new();
    let exporter = Arc::new(LoggingExporter::new(settings.output_format));
    let workload = Arc::new(ExampleWorkload::new(stats, exporter.clone(), settings));

    let mut host = ExporterHost::new(
        Arc::new(ConsoleSurface::new()),
        Arc::new(TokioExecutor::current()),
        workload,
    );

    if let Err(e) = host.on_create() {
        report_error(&e);
        std::process::exit(exit_code(e.severity()));
    }

    let Some(completion) = host.task().map(|task| task.completion()) else {
        return Ok(());
    };

    let outcome = tokio::select! {
        outcome = completion.wait() => {
            host.on_destroy();
            outcome
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, destroying host");
            match host.on_destroy() {
                Some(task) => task.join().await,
                None => TaskOutcome::Aborted,
            }
        }
    };

    tracing::info!(
        "📊 {} metric batches exported",
        exporter.batches_exported()
    );

    match outcome {
        TaskOutcome::Completed => {
            println!("✅ Exporter finished");
            Ok(())
        }
        TaskOutcome::Failed(message) => {
            eprintln!("❌ Exporter failed: {}", message);
            std::process::exit(1);
        }
        TaskOutcome::Panicked(message) => {
            eprintln!("❌ Exporter crashed: {}", message);
            std::process::exit(3);
        }
        TaskOutcome::Aborted => {
            eprintln!("⚠️ Exporter was aborted");
            std::process::exit(2);
        }
    }
}

fn exit_on_invalid<V: Validate>(config: &V) {
    if let Err(e) = config.validate() {
        report_error(&e);
        std::process::exit(exit_code(e.severity()));
    }
}

fn report_error(e: &ExporterError) {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
