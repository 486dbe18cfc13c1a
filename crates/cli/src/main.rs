mod logging;
mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use datamover_core::{
    config_fingerprint, load_config, metrics, validate_config, Config, PipelineOrchestrator,
    PipelineStatus, Tier, DEFAULT_SMOKE_TEST_FILE,
};

use logging::LogFormat;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(
    name = "datamover",
    about = "Moves instrument data to the archive, ingests it and schedules cleanup",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "DATAMOVER_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Write Prometheus metrics to this file when the command finishes.
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full pipeline for one instrument-reported file.
    Process {
        /// Absolute path as reported by the instrument.
        file_path: String,
    },

    /// Copy a test file through every tier without ingesting or deleting.
    SmokeTest {
        /// File relative to the instrument root.
        #[arg(long, default_value = DEFAULT_SMOKE_TEST_FILE)]
        file_path: String,
    },

    /// Load and validate the configuration, then print a summary.
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    };

    if let Some(path) = &cli.metrics_file {
        if let Err(e) = write_metrics(path).await {
            warn!("Failed to write metrics to {:?}: {:#}", path, e);
        }
    }
    code
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    info!("datamover {} loading configuration from {:?}", VERSION, cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    match &cli.command {
        Command::CheckConfig => {
            let summary = serde_json::to_string_pretty(&config_summary(&config))?;
            println!("{summary}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Process { file_path } => {
            let orchestrator = orchestrator(config).await?;
            match orchestrator.run(file_path).await {
                Ok(report) => {
                    if report.status() == PipelineStatus::Degraded {
                        for step in report.failed_steps() {
                            warn!(stage = %step.stage, "Step failed: {:?}", step.status);
                        }
                    }
                    info!(
                        run_id = %report.run_id,
                        status = report.status().as_str(),
                        "Processed {}",
                        report.relative_path
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!(halted_at = %e.halted_at(), "Pipeline halted: {}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::SmokeTest { file_path } => {
            let orchestrator = orchestrator(config).await?;
            match orchestrator.smoke_test(file_path).await {
                Ok(report) => {
                    info!(run_id = %report.run_id, "Smoke test passed using {}", report.copy);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!("Smoke test failed: {}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

async fn orchestrator(config: Config) -> Result<PipelineOrchestrator> {
    let collaborators = services::build_collaborators(&config).await?;
    PipelineOrchestrator::new(config, collaborators).context("Failed to create orchestrator")
}

fn config_summary(config: &Config) -> serde_json::Value {
    let endpoint = |tier: Tier| {
        let endpoint = config.endpoints.get(tier);
        serde_json::json!({
            "name": endpoint.name,
            "root_path": endpoint.root_path,
            "endpoint_id": endpoint.endpoint_id,
        })
    };
    serde_json::json!({
        "fingerprint": config_fingerprint(config),
        "path_marker": config.path.marker,
        "endpoints": {
            "instrument": endpoint(Tier::Instrument),
            "facility": endpoint(Tier::Facility),
            "archive": endpoint(Tier::Archive),
        },
        "transfer": {
            "max_wait_secs": config.transfer.max_wait_secs,
            "poll_interval_secs": config.transfer.poll_interval_secs,
        },
        "retention": {
            "instrument_days": config.retention.instrument_days,
            "facility_days": config.retention.facility_days,
        },
        "ingest": {
            "jobs_api_url": config.ingest.jobs_api_url,
            "dataset_tag": config.ingest.dataset_tag,
        },
    })
}

async fn write_metrics(path: &Path) -> Result<()> {
    let text = metrics::encode_metrics().context("Failed to encode metrics")?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
