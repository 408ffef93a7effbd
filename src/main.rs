//! `pending-reaper` -- one reconciliation pass over a Mailman 3 list manager.
//!
//! Meant to be started by a scheduler (systemd timer, cron, Kubernetes
//! CronJob). Exit status is 0 whenever the pass ran, even if some requests
//! could not be cancelled; those are retried by the next run.
//!
//! | Exit | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | pass completed                                 |
//! | 1    | list manager unreachable or credentials refused |
//! | 2    | invalid configuration                          |

use anyhow::Context;
use clap::Parser;
use pending_reaper::utils::format_duration;
use pending_reaper::{
    load_settings, run, Args, ClientError, ConfigError, HttpListManager, OutputFormat, Summary,
};
use std::io::Write;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "pending_reaper=info";

/// Reasons a pass never got to run
#[derive(Error, Debug)]
enum PassError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connect(#[from] ClientError),
}

impl PassError {
    fn exit_status(&self) -> u8 {
        match self {
            PassError::Connect(_) => 1,
            PassError::Config(_) => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Initialize logging; stdout is reserved for the report
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {}", e);
    }

    match reconcile(Args::parse()).await {
        Ok((summary, output)) => {
            if let Err(e) = write_report(&summary, output) {
                error!(error = %e, "Failed to write report");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Aborting pass");
            ExitCode::from(e.exit_status())
        }
    }
}

/// Resolve settings, connect, and run one pass.
async fn reconcile(args: Args) -> Result<(Summary, OutputFormat), PassError> {
    let settings = load_settings(args).await?;

    let min_age = settings
        .run
        .policy
        .min_age
        .map(format_duration)
        .unwrap_or_else(|| "none".to_string());
    info!(
        api_url = %settings.http.base_url,
        min_age = %min_age,
        action = settings.run.action.as_str(),
        dry_run = settings.run.dry_run,
        concurrency = settings.run.concurrency,
        "Starting reconciliation pass"
    );

    let client = HttpListManager::connect(&settings.http).await?;
    let summary = run(&client, &settings.run, chrono::Utc::now()).await;
    Ok((summary, settings.output))
}

fn write_report(summary: &Summary, format: OutputFormat) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Text => write!(stdout, "{}", summary).context("writing text report")?,
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(summary).context("serializing summary")?;
            writeln!(stdout, "{}", json).context("writing JSON report")?;
        }
    }
    stdout.flush().context("flushing report")?;
    Ok(())
}
