pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::{
    Asset, AssetRegistry, AssetResolver, RateCache, RateEngine, RateQueryRequest, TaskExecutor,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub use crate::cli::rates::OutputFormat;

pub enum AppCommand {
    Rates {
        request: RateQueryRequest,
        format: OutputFormat,
    },
}

/// Wires registry, cache, oracle chain and executor from configuration.
pub fn build_executor(config: &AppConfig) -> Result<TaskExecutor> {
    let registry = AssetRegistry::new().with_assets(
        config
            .assets
            .iter()
            .map(|a| Asset::new(&a.identifier, &a.name, a.kind)),
    );
    let reference = registry
        .resolve(&config.reference_currency)
        .with_context(|| format!("Invalid reference currency: {}", config.reference_currency))?;

    let chain = providers::build_chain(config);
    if chain.is_empty() {
        anyhow::bail!("No oracles configured");
    }
    debug!(
        worst_case = ?chain.worst_case(),
        "Oracle chain time budget per asset"
    );

    let engine = RateEngine::new(
        Arc::new(registry),
        RateCache::new(config.cache_ttl()),
        chain,
        reference,
    );
    Ok(TaskExecutor::new(Arc::new(engine), config.workers))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxq starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let executor = build_executor(&config)?;

    match command {
        AppCommand::Rates { request, format } => cli::rates::run(&executor, request, format).await,
    }
}
