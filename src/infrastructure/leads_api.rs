use async_trait::async_trait;
use serde_json::Value;

use crate::domain::lead::FetchOutcome;

#[async_trait]
pub trait LeadSource: Send + Sync {
    /// Never fails: transport and decoding problems come back as
    /// `FetchOutcome::Failed`.
    async fn fetch_leads(&self) -> FetchOutcome;
}

pub struct LeadsApiClient {
    client: reqwest::Client,
    api_url: String,
}

impl LeadsApiClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    async fn request(&self) -> reqwest::Result<Value> {
        self.client
            .get(&self.api_url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl LeadSource for LeadsApiClient {
    async fn fetch_leads(&self) -> FetchOutcome {
        match self.request().await {
            Ok(value) => {
                tracing::info!("Fetched leads from {}", self.api_url);
                FetchOutcome::Data(value)
            }
            Err(err) => {
                tracing::warn!("Lead fetch from {} failed: {}", self.api_url, err);
                FetchOutcome::failed(err.to_string())
            }
        }
    }
}
