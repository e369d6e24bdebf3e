use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use validator::Validate;

use crate::domain::error::{AppError, Result};

pub const CONFIG_FILE: &str = "leaddesk.toml";
pub const DEFAULT_RESOURCE_MANAGER_URL: &str = "https://management.azure.com";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_STATIC_DIR: &str = "static";

const CONFIG_KEYS: [&str; 8] = [
    "api_url",
    "azure_storage_account_url",
    "azure_subscription_id",
    "azure_resource_group_name",
    "azure_resource_manager_url",
    "loader_bind_address",
    "static_dir",
    "static_assets_dir",
];

/// Loads `.env` into the process environment if one exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!("Ignoring unreadable .env file: {}", err),
    }
}

/// `leaddesk.toml` first, process environment on top.
pub fn figment() -> Figment {
    Figment::new()
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::raw().only(&CONFIG_KEYS))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DashboardConfig {
    #[validate(url)]
    pub api_url: String,
}

impl DashboardConfig {
    pub fn load() -> Result<Self> {
        Self::from_figment(&figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw: RawDashboardConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        let api_url = raw
            .api_url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                AppError::ConfigError(
                    "API_URL environment variable not set. Please check your .env file."
                        .to_string(),
                )
            })?;
        let config = Self { api_url };
        config
            .validate()
            .map_err(|e| AppError::ConfigError(format!("invalid API_URL: {}", e)))?;
        Ok(config)
    }
}

#[derive(Deserialize)]
struct RawDashboardConfig {
    api_url: Option<String>,
}

/// Settings for the data loader, CLI and service alike. Azure identifiers
/// stay optional here; a missing one fails only the action that needs it.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoaderConfig {
    #[validate(url)]
    pub azure_storage_account_url: Option<String>,
    pub azure_subscription_id: Option<String>,
    pub azure_resource_group_name: Option<String>,
    #[serde(default = "default_resource_manager_url")]
    #[validate(url)]
    pub azure_resource_manager_url: String,
    #[serde(default = "default_bind_address")]
    pub loader_bind_address: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    pub static_assets_dir: Option<PathBuf>,
}

fn default_resource_manager_url() -> String {
    DEFAULT_RESOURCE_MANAGER_URL.to_string()
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATIC_DIR)
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            azure_storage_account_url: None,
            azure_subscription_id: None,
            azure_resource_group_name: None,
            azure_resource_manager_url: default_resource_manager_url(),
            loader_bind_address: default_bind_address(),
            static_dir: default_static_dir(),
            static_assets_dir: None,
        }
    }
}

impl LoaderConfig {
    pub fn load() -> Result<Self> {
        Self::from_figment(&figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config = figment
            .extract::<Self>()
            .map_err(|e| AppError::ConfigError(e.to_string()))?
            .normalized();
        config
            .validate()
            .map_err(|e| AppError::ConfigError(format!("invalid loader configuration: {}", e)))?;
        Ok(config)
    }

    // Blank values from `.env` templates count as unset.
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.azure_storage_account_url,
            &mut self.azure_subscription_id,
            &mut self.azure_resource_group_name,
        ] {
            if field.as_deref().map(str::trim).is_some_and(str::is_empty) {
                *field = None;
            }
        }
        self
    }

    pub fn storage_account_url(&self) -> Result<&str> {
        self.azure_storage_account_url.as_deref().ok_or_else(|| {
            AppError::ConfigError("Azure Storage Account URL is not configured.".to_string())
        })
    }

    pub fn subscription_id(&self) -> Result<&str> {
        self.azure_subscription_id.as_deref().ok_or_else(|| {
            AppError::ConfigError("Azure Subscription ID is not configured.".to_string())
        })
    }

    pub fn resource_group_name(&self) -> Result<&str> {
        self.azure_resource_group_name.as_deref().ok_or_else(|| {
            AppError::ConfigError("Azure Resource Group name is not configured.".to_string())
        })
    }

    pub fn index_file(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }

    pub fn assets_dir(&self) -> &Path {
        self.static_assets_dir
            .as_deref()
            .unwrap_or(self.static_dir.as_path())
    }
}
