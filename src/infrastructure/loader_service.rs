use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

use crate::application::DataLoader;
use crate::domain::error::{AppError, Result};
use crate::domain::upload::{container_for_source, UploadArtifact, UploadReceipt, UploadResponse};
use crate::domain::workflow_run::WorkflowRunStatus;

#[derive(Deserialize)]
struct ErrorDetail {
    detail: serde_json::Value,
}

/// Client for a running `data-loader-server`, speaking the same API as the
/// bundled web client.
pub struct LoaderServiceClient {
    client: reqwest::Client,
    base_url: Url,
}

impl LoaderServiceClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid loader service URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::ConfigError(format!(
                "Loader service URL '{}' cannot carry a path",
                base_url
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorDetail>(&text)
            .map(|body| match body.detail {
                serde_json::Value::String(message) => message,
                other => other.to_string(),
            })
            .unwrap_or_else(|_| format!("{} {}", status, text));
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            AppError::ValidationError(detail)
        } else {
            AppError::HttpError(detail)
        }
    }
}

#[async_trait]
impl DataLoader for LoaderServiceClient {
    async fn upload(&self, artifact: UploadArtifact) -> Result<UploadReceipt> {
        let container = container_for_source(&artifact.source).to_string();
        let form = Form::new()
            .part(
                "file",
                Part::bytes(artifact.content).file_name(artifact.filename.clone()),
            )
            .text("source", artifact.source.clone());

        let response = self
            .client
            .post(self.endpoint(&["upload"]))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body: UploadResponse = response.json().await?;
        Ok(UploadReceipt {
            filename: body.filename,
            container,
        })
    }

    async fn workflow_status(&self, workflow_name: &str) -> Result<WorkflowRunStatus> {
        let response = self
            .client
            .get(self.endpoint(&["logicapp-status", workflow_name]))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json().await?)
    }
}
