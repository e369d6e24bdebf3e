use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::credential::{TokenCredential, MANAGEMENT_SCOPE};
use super::LOGIC_API_VERSION;
use crate::domain::error::{AppError, Result};
use crate::domain::workflow_run::WorkflowRun;

#[async_trait]
pub trait WorkflowRunSource: Send + Sync {
    /// First page of a workflow's run history, in service order.
    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<WorkflowRun>>;
}

#[derive(Deserialize)]
struct RunListResponse {
    #[serde(default)]
    value: Vec<WorkflowRun>,
}

pub struct LogicAppsClient {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    management_url: String,
    subscription_id: Option<String>,
    resource_group: Option<String>,
}

impl LogicAppsClient {
    pub fn new(
        http: reqwest::Client,
        credential: Arc<dyn TokenCredential>,
        management_url: impl Into<String>,
        subscription_id: Option<String>,
        resource_group: Option<String>,
    ) -> Self {
        Self {
            http,
            credential,
            management_url: management_url.into(),
            subscription_id,
            resource_group,
        }
    }

    fn runs_url(&self, workflow_name: &str) -> Result<Url> {
        let subscription_id = self.subscription_id.as_deref().ok_or_else(|| {
            AppError::ConfigError("Azure Subscription ID is not configured.".to_string())
        })?;
        let resource_group = self.resource_group.as_deref().ok_or_else(|| {
            AppError::ConfigError("Azure Resource Group name is not configured.".to_string())
        })?;

        let mut url = Url::parse(&self.management_url).map_err(|e| {
            AppError::ConfigError(format!(
                "Invalid resource manager URL '{}': {}",
                self.management_url, e
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::ConfigError(format!(
                    "Resource manager URL '{}' cannot carry a path",
                    self.management_url
                ))
            })?
            .pop_if_empty()
            .extend([
                "subscriptions",
                subscription_id,
                "resourceGroups",
                resource_group,
                "providers",
                "Microsoft.Logic",
                "workflows",
                workflow_name,
                "runs",
            ]);
        url.query_pairs_mut()
            .append_pair("api-version", LOGIC_API_VERSION);
        Ok(url)
    }
}

/// Resource manager errors arrive as `{"error": {"code", "message"}}`.
fn resource_manager_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .or_else(|| error.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl WorkflowRunSource for LogicAppsClient {
    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<WorkflowRun>> {
        let url = self.runs_url(workflow_name)?;
        let token = self.credential.get_token(MANAGEMENT_SCOPE).await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&token.token)
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|e| AppError::WorkflowError(format!("Run history request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = resource_manager_message(&text).unwrap_or(text);
            return Err(AppError::WorkflowError(format!(
                "Listing runs of '{}' failed ({}): {}",
                workflow_name, status, detail
            )));
        }

        let listing: RunListResponse = response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse run history: {}", e)))?;
        tracing::debug!(
            "Workflow {} returned {} runs",
            workflow_name,
            listing.value.len()
        );
        Ok(listing.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::azure::test_support::{spawn_recorder, StaticCredential};

    fn client(base_url: &str) -> LogicAppsClient {
        LogicAppsClient::new(
            reqwest::Client::new(),
            Arc::new(StaticCredential),
            base_url,
            Some("sub-123".to_string()),
            Some("leads-rg".to_string()),
        )
    }

    #[test]
    fn test_runs_url_layout() {
        let url = client("https://management.azure.com")
            .runs_url("ingest leads")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/sub-123/resourceGroups/leads-rg/providers/Microsoft.Logic/workflows/ingest%20leads/runs?api-version=2016-06-01"
        );
    }

    #[test]
    fn test_missing_identifiers_are_config_errors() {
        let client = LogicAppsClient::new(
            reqwest::Client::new(),
            Arc::new(StaticCredential),
            "https://management.azure.com",
            None,
            Some("rg".to_string()),
        );
        assert!(matches!(client.runs_url("wf"), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_resource_manager_message_extraction() {
        let body = r#"{"error":{"code":"ResourceNotFound","message":"The workflow 'x' could not be found."}}"#;
        assert_eq!(
            resource_manager_message(body).as_deref(),
            Some("The workflow 'x' could not be found.")
        );
        assert_eq!(resource_manager_message("plain text"), None);
    }

    #[actix_web::test]
    async fn test_list_runs_parses_listing() {
        let body = r#"{"value":[
            {"name":"085861","properties":{"status":"Failed","startTime":"2024-05-01T08:00:00Z","error":{"code":"ActionFailed","message":"Copy step failed."}}},
            {"name":"085860","properties":{"status":"Succeeded","startTime":"2024-04-30T08:00:00Z"}}
        ]}"#;
        let stub = spawn_recorder(200, body).await;
        let runs = client(&stub.base_url).list_runs("dsilaslogicapp").await.unwrap();

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].name, "085861");
        assert_eq!(runs[0].error_message().as_deref(), Some("Copy step failed."));

        let requests = stub.requests();
        assert_eq!(
            requests[0].path,
            "/subscriptions/sub-123/resourceGroups/leads-rg/providers/Microsoft.Logic/workflows/dsilaslogicapp/runs"
        );
        assert_eq!(requests[0].query, "api-version=2016-06-01");
        assert_eq!(requests[0].header("authorization"), Some("Bearer static-token"));
    }

    #[actix_web::test]
    async fn test_list_runs_empty_history() {
        let stub = spawn_recorder(200, r#"{"value":[]}"#).await;
        let runs = client(&stub.base_url).list_runs("idle").await.unwrap();
        assert!(runs.is_empty());
    }

    #[actix_web::test]
    async fn test_list_runs_surfaces_resource_manager_error() {
        let stub = spawn_recorder(
            404,
            r#"{"error":{"code":"ResourceNotFound","message":"The Resource 'Microsoft.Logic/workflows/nope' was not found."}}"#,
        )
        .await;
        let err = client(&stub.base_url).list_runs("nope").await.unwrap_err();
        assert!(matches!(err, AppError::WorkflowError(_)));
        assert!(err.message().contains("was not found"));
    }
}
