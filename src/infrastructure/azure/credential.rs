use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::domain::error::{AppError, Result};

pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const REFRESH_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - chrono::Duration::minutes(REFRESH_MARGIN_MINUTES) > now
    }
}

#[async_trait]
pub trait TokenCredential: Send + Sync {
    fn name(&self) -> &'static str;
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

/// `https://storage.azure.com/.default` → `https://storage.azure.com`
fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Reads an expiry that arrives as epoch seconds, either as a number or a
/// numeric string depending on the token endpoint.
fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn expiry_from_epoch(value: &Value) -> Option<DateTime<Utc>> {
    epoch_seconds(value).and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

fn expiry_from_lifetime(value: &Value) -> Option<DateTime<Utc>> {
    epoch_seconds(value).map(|secs| Utc::now() + chrono::Duration::seconds(secs))
}

/// Service principal from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
/// `AZURE_CLIENT_SECRET`, using the client-credentials grant.
pub struct EnvironmentCredential {
    http: reqwest::Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl EnvironmentCredential {
    pub fn from_env(http: reqwest::Client) -> Option<Self> {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            http,
            authority_host: read("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            tenant_id: read("AZURE_TENANT_ID")?,
            client_id: read("AZURE_CLIENT_ID")?,
            client_secret: read("AZURE_CLIENT_SECRET")?,
        })
    }
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Value,
    #[serde(default)]
    expires_on: Value,
}

impl OAuthTokenResponse {
    fn into_token(self) -> Result<AccessToken> {
        let expires_at = expiry_from_epoch(&self.expires_on)
            .or_else(|| expiry_from_lifetime(&self.expires_in))
            .ok_or_else(|| AppError::AuthError("token response carried no expiry".to_string()))?;
        Ok(AccessToken {
            token: self.access_token,
            expires_at,
        })
    }
}

async fn read_token_response(response: reqwest::Response, source: &str) -> Result<AccessToken> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(AppError::AuthError(format!(
            "{} token request failed ({}): {}",
            source, status, text
        )));
    }
    response
        .json::<OAuthTokenResponse>()
        .await
        .map_err(|e| AppError::AuthError(format!("{} token response unreadable: {}", source, e)))?
        .into_token()
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        );
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope),
            ])
            .send()
            .await
            .map_err(|e| AppError::AuthError(format!("environment token request failed: {}", e)))?;
        read_token_response(response, "environment").await
    }
}

enum ManagedIdentityEndpoint {
    AppService { endpoint: String, header: String },
    Imds,
}

/// Managed identity through App Service (`IDENTITY_ENDPOINT` and
/// `IDENTITY_HEADER`) or the instance metadata service. `AZURE_CLIENT_ID`
/// selects a user-assigned identity.
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    endpoint: ManagedIdentityEndpoint,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    pub fn from_env() -> Result<Self> {
        let endpoint = match (
            std::env::var("IDENTITY_ENDPOINT").ok(),
            std::env::var("IDENTITY_HEADER").ok(),
        ) {
            (Some(endpoint), Some(header)) => ManagedIdentityEndpoint::AppService { endpoint, header },
            _ => ManagedIdentityEndpoint::Imds,
        };
        // Off Azure the metadata address does not answer; fail fast so the
        // chain can move on to the CLI.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(1))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build identity client: {}", e)))?;
        let client_id = std::env::var("AZURE_CLIENT_ID")
            .ok()
            .filter(|v| !v.trim().is_empty());
        Ok(Self {
            http,
            endpoint,
            client_id,
        })
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "managed identity"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope_to_resource(scope);
        let mut request = match &self.endpoint {
            ManagedIdentityEndpoint::AppService { endpoint, header } => self
                .http
                .get(endpoint)
                .query(&[("api-version", "2019-08-01"), ("resource", resource)])
                .header("X-IDENTITY-HEADER", header),
            ManagedIdentityEndpoint::Imds => self
                .http
                .get(IMDS_ENDPOINT)
                .query(&[("api-version", "2018-02-01"), ("resource", resource)])
                .header("Metadata", "true"),
        };
        if let Some(client_id) = &self.client_id {
            request = request.query(&[("client_id", client_id.as_str())]);
        }
        let response = request.send().await.map_err(|e| {
            AppError::AuthError(format!("managed identity endpoint unavailable: {}", e))
        })?;
        read_token_response(response, "managed identity").await
    }
}

/// Token from a signed-in Azure CLI session.
pub struct AzureCliCredential;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<String>,
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Value,
}

impl CliTokenResponse {
    fn into_token(self) -> Result<AccessToken> {
        let expires_at = expiry_from_epoch(&self.expires_on_epoch)
            .or_else(|| {
                // Older CLIs only report local wall-clock time.
                let raw = self.expires_on.as_deref()?;
                let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok()?;
                chrono::Local
                    .from_local_datetime(&naive)
                    .single()
                    .map(|local| local.with_timezone(&Utc))
            })
            .ok_or_else(|| AppError::AuthError("Azure CLI token carried no expiry".to_string()))?;
        Ok(AccessToken {
            token: self.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "azure cli"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                scope_to_resource(scope),
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| AppError::AuthError(format!("Azure CLI not available: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::AuthError(format!(
                "Azure CLI token request failed: {}",
                stderr.trim()
            )));
        }
        serde_json::from_slice::<CliTokenResponse>(&output.stdout)
            .map_err(|e| AppError::AuthError(format!("Azure CLI output unreadable: {}", e)))?
            .into_token()
    }
}

type TokenSlot = Arc<Mutex<Option<AccessToken>>>;

/// Tries each source in order and caches tokens per scope until they are
/// close to expiry. Built once per process and shared by every client.
/// Each scope has its own slot: concurrent callers for one scope share a
/// single fetch, while other scopes proceed independently.
pub struct ChainedCredential {
    sources: Vec<Box<dyn TokenCredential>>,
    cache: Mutex<HashMap<String, TokenSlot>>,
}

impl ChainedCredential {
    pub fn new(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self {
            sources,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Environment service principal, then managed identity, then Azure CLI.
    pub fn from_env(http: reqwest::Client) -> Result<Self> {
        let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();
        if let Some(env) = EnvironmentCredential::from_env(http) {
            sources.push(Box::new(env));
        }
        sources.push(Box::new(ManagedIdentityCredential::from_env()?));
        sources.push(Box::new(AzureCliCredential));
        Ok(Self::new(sources))
    }
}

#[async_trait]
impl TokenCredential for ChainedCredential {
    fn name(&self) -> &'static str {
        "chained"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let slot = self
            .cache
            .lock()
            .await
            .entry(scope.to_string())
            .or_default()
            .clone();
        let mut cached = slot.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh_at(Utc::now()) {
                return Ok(token.clone());
            }
        }

        let mut failures = Vec::new();
        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    tracing::debug!("Acquired token for {} from {}", scope, source.name());
                    *cached = Some(token.clone());
                    return Ok(token);
                }
                Err(err) => {
                    tracing::debug!("Credential source {} failed: {}", source.name(), err);
                    failures.push(format!("{}: {}", source.name(), err.message()));
                }
            }
        }
        Err(AppError::AuthError(format!(
            "No Azure credential available ({})",
            failures.join("; ")
        )))
    }
}
