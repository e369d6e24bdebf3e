use crate::domain::error::{AppError, Result};
use crate::domain::workflow_run::WorkflowRunStatus;
use crate::infrastructure::azure::WorkflowRunSource;
use std::sync::Arc;

pub struct WorkflowStatusUseCase {
    runs: Arc<dyn WorkflowRunSource>,
}

impl WorkflowStatusUseCase {
    pub fn new(runs: Arc<dyn WorkflowRunSource>) -> Self {
        Self { runs }
    }

    pub async fn execute(&self, workflow_name: &str) -> Result<WorkflowRunStatus> {
        if workflow_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Please enter a Logic App Workflow Name.".to_string(),
            ));
        }

        let runs = self.runs.list_runs(workflow_name).await?;
        let status = WorkflowRunStatus::from_runs(&runs);
        tracing::info!(
            "Workflow {} latest run {:?}: {}",
            workflow_name,
            status.name,
            status.status
        );
        Ok(status)
    }
}
