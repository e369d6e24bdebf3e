use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::application::{AzureDataLoader, DataLoader};
use crate::domain::error::Result;
use crate::infrastructure::azure::{AzureBlobStore, ChainedCredential, LogicAppsClient};
use crate::infrastructure::config::{load_dotenv, LoaderConfig};
use crate::interfaces::{cli, dashboard, http};

/// Logs go to stderr so they never mix with command output. `RUST_LOG`
/// overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Wires the Azure clients behind one HTTP client and one credential.
/// Missing Azure identifiers only fail the operation that needs them.
pub fn build_azure_loader(config: &LoaderConfig) -> Result<Arc<dyn DataLoader>> {
    let http = reqwest::Client::new();
    let credential = Arc::new(ChainedCredential::from_env(http.clone())?);

    let blob_store = Arc::new(AzureBlobStore::new(
        http.clone(),
        credential.clone(),
        config.azure_storage_account_url.clone(),
    ));
    let runs = Arc::new(LogicAppsClient::new(
        http,
        credential,
        config.azure_resource_manager_url.clone(),
        config.azure_subscription_id.clone(),
        config.azure_resource_group_name.clone(),
    ));
    if config.azure_storage_account_url.is_none() {
        tracing::warn!("AZURE_STORAGE_ACCOUNT_URL is not set; uploads will fail");
    }
    if config.azure_subscription_id.is_none() || config.azure_resource_group_name.is_none() {
        tracing::warn!("Azure subscription or resource group is not set; status checks will fail");
    }

    Ok(Arc::new(AzureDataLoader::new(blob_store, runs)))
}

pub async fn run_dashboard(print_edits: bool) -> Result<()> {
    load_dotenv();
    init_tracing("warn");
    dashboard::run(print_edits).await
}

pub async fn run_loader_cli(args: cli::Cli) -> Result<()> {
    load_dotenv();
    init_tracing("warn");
    cli::run(args).await
}

pub async fn run_loader_server() -> Result<()> {
    load_dotenv();
    init_tracing("info");
    let config = LoaderConfig::load()?;
    let loader = build_azure_loader(&config)?;
    http::start_server(loader, &config)?.await?;
    Ok(())
}
