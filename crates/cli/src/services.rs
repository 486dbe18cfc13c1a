//! Builds the production collaborators from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use datamover_core::{
    Collaborators, Config, EnvSecretStore, HttpFlowScheduler, HttpIngestApi, HttpTransferClient,
    SecretStore,
};

/// Resolves credentials and constructs the HTTP-backed collaborators.
///
/// The transfer token and the optional scheduler key are loaded here; the
/// ingestion token is loaded per run, right before it is needed.
pub async fn build_collaborators(config: &Config) -> Result<Collaborators> {
    let secrets = Arc::new(EnvSecretStore::new(config.secrets.env_prefix.clone()));

    let transfer_token = secrets
        .load(&config.transfer.token_secret)
        .await
        .with_context(|| {
            format!(
                "Failed to load transfer token {:?}",
                config.transfer.token_secret
            )
        })?;
    let transfer = HttpTransferClient::new(&config.transfer, transfer_token)
        .context("Failed to create transfer client")?;
    info!("Transfer client targeting {}", config.transfer.api_url);

    let ingest = HttpIngestApi::new(config.ingest.request_timeout())
        .context("Failed to create ingest client")?;

    let api_key = match &config.scheduler.api_key_secret {
        Some(name) => Some(
            secrets
                .load(name)
                .await
                .with_context(|| format!("Failed to load scheduler API key {name:?}"))?,
        ),
        None => None,
    };
    let scheduler = HttpFlowScheduler::new(
        &config.scheduler.api_url,
        api_key,
        config.scheduler.request_timeout(),
    )
    .context("Failed to create scheduler client")?;
    info!("Scheduler client targeting {}", config.scheduler.api_url);

    Ok(Collaborators::new(
        Arc::new(transfer),
        Arc::new(ingest),
        Arc::new(scheduler),
        secrets,
    ))
}
