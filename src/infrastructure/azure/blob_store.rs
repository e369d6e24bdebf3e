use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use super::credential::{TokenCredential, STORAGE_SCOPE};
use super::STORAGE_API_VERSION;
use crate::domain::error::{AppError, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `content` to `container/blob_name`, replacing any existing blob.
    async fn put_blob(&self, container: &str, blob_name: &str, content: Vec<u8>) -> Result<()>;
}

pub struct AzureBlobStore {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    account_url: Option<String>,
}

impl AzureBlobStore {
    pub fn new(
        http: reqwest::Client,
        credential: Arc<dyn TokenCredential>,
        account_url: Option<String>,
    ) -> Self {
        Self {
            http,
            credential,
            account_url,
        }
    }

    fn blob_url(account_url: &str, container: &str, blob_name: &str) -> Result<Url> {
        // URL path normalisation would drop these segments and store the
        // blob under a different name than the one reported back.
        if blob_name.split('/').any(|part| part == "." || part == "..") {
            return Err(AppError::ValidationError(format!(
                "Invalid file name '{}': '.' and '..' path segments are not allowed",
                blob_name
            )));
        }
        let mut url = Url::parse(account_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid storage account URL '{}': {}", account_url, e))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AppError::ConfigError(format!(
                    "Storage account URL '{}' cannot carry a path",
                    account_url
                ))
            })?;
            segments.pop_if_empty().push(container);
            // Keep virtual directories in blob names as path separators.
            for part in blob_name.split('/') {
                segments.push(part);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put_blob(&self, container: &str, blob_name: &str, content: Vec<u8>) -> Result<()> {
        let account_url = self.account_url.as_deref().ok_or_else(|| {
            AppError::ConfigError("Azure Storage Account URL is not configured.".to_string())
        })?;
        if blob_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Blob name must not be empty".to_string(),
            ));
        }
        let url = Self::blob_url(account_url, container, blob_name)?;
        let token = self.credential.get_token(STORAGE_SCOPE).await?;

        let size = content.len();
        // No conditional headers: Put Blob replaces an existing blob.
        let response = self
            .http
            .put(url.clone())
            .bearer_auth(&token.token)
            .header("x-ms-version", STORAGE_API_VERSION)
            .header(
                "x-ms-date",
                Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            )
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let code = response
                .headers()
                .get("x-ms-error-code")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
                .unwrap_or_default();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::StorageError(format!(
                "Upload to {}/{} failed ({}) {}: {}",
                container, blob_name, status, code, text
            )));
        }

        tracing::info!("Uploaded {} bytes to {}/{}", size, container, blob_name);
        Ok(())
    }
}
