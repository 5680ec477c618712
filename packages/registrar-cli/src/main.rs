// Entry point for the match registration watcher.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notify::NotificationManager;
use practiscore_client::{Credentials, PractiscoreClient};
use registrar_engine::{discover_records, run_once, survey_statuses, RunConfig};

#[derive(Parser)]
#[command(name = "registrar", about = "PractiScore match registration watcher", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify every discovered match and register for the first open one
    Run,
    /// Classify every discovered match without registering
    Check,
    /// List matches discovered on the club page
    Matches,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,registrar_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = RunConfig::from_env().context("Failed to load run configuration")?;
    let credentials = Credentials::from_env().context("Failed to load credentials")?;
    let client = PractiscoreClient::new(&config.base_url, credentials)
        .context("Failed to build PractiScore client")?;

    match cli.command {
        Command::Run => {
            let notifier = NotificationManager::from_env();
            let report = run_once(&config, &client, &client, &notifier).await?;

            for outcome in report.outcomes() {
                println!(
                    "{:?} -> {:?}: {}",
                    outcome.status, outcome.action, outcome.record.title
                );
            }
            let summary = report.summary();
            println!(
                "registered: {} | notified: {} | skipped: {}",
                summary.registered, summary.notified, summary.skipped
            );
        }
        Command::Check => {
            let statuses = survey_statuses(&config, &client).await?;
            if statuses.is_empty() {
                println!("No matching events found");
            }
            for (record, status) in statuses {
                println!("{:?}: {} ({})", status, record.title, record.detail_url);
            }
        }
        Command::Matches => {
            let records = discover_records(&config, &client).await;
            if records.is_empty() {
                println!("No matching events found");
            }
            for record in records {
                println!("{} ({})", record.title, record.detail_url);
            }
        }
    }

    Ok(())
}
