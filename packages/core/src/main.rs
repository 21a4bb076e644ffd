use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;

use seatwatch::cli::Cli;
use seatwatch::config::{self, Config};
use seatwatch::error::AppError;
use seatwatch::logging::init_logging;
use seatwatch::metrics::MonitorMetrics;
use seatwatch::monitor::{registry, Target};
use seatwatch::scheduler::{Collaborators, Orchestrator};
use seatwatch::services::http_analyzer::HttpAnalyzer;
use seatwatch::services::http_fetcher::HttpFetcher;
use seatwatch::services::telegram::TelegramNotifier;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();
    init_logging();

    if let Err(err) = run(cli).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::from_env().map_err(AppError::Config)?;
    config.apply_cli(&cli);
    tracing::info!("Service started with config: {:?}", config);

    let targets = load_targets(&config)?;
    if targets.is_empty() {
        tracing::warn!("No enabled targets to monitor");
    }

    let metrics = Arc::new(MonitorMetrics::new()?);
    let collaborators = Collaborators {
        fetcher: Arc::new(HttpFetcher::new()?),
        analyzer: Arc::new(HttpAnalyzer::new(config.analyzer_url.clone())),
        notifier: Arc::new(TelegramNotifier::new(
            config.telegram_api_url.clone(),
            config.telegram_bot_token.clone(),
        )),
    };

    let orchestrator = Orchestrator::new(collaborators, config.monitor.clone(), metrics.clone());
    let handle = orchestrator.start_all(&targets);

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", err);
    }

    let report = handle.stop(config.shutdown_grace).await;
    if !report.aborted.is_empty() {
        tracing::warn!("Aborted loops: {}", report.aborted.join(", "));
    }

    match metrics.render() {
        Ok(text) => tracing::debug!("Final metrics:\n{}", text),
        Err(err) => tracing::warn!("Cannot render metrics: {}", err),
    }
    Ok(())
}

/// Read and validate the targets file. Invalid entries are logged and
/// skipped; an unreadable file stops startup.
fn load_targets(config: &Config) -> Result<Vec<Target>, AppError> {
    let raw = config::read_targets(&config.targets_file)?;
    let load = registry::load_json(raw);

    for err in &load.errors {
        tracing::error!("Skipping target: {}", err);
    }

    let mut targets: Vec<Target> = load.enabled().cloned().collect();
    if let Some(chat_id) = &config.telegram_chat_id {
        for target in targets.iter_mut().filter(|t| t.recipients.is_empty()) {
            target.recipients.push(chat_id.clone());
        }
    }

    tracing::info!(
        "Loaded {} enabled targets from {}",
        targets.len(),
        config.targets_file.display()
    );
    Ok(targets)
}
