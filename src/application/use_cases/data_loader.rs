use async_trait::async_trait;
use std::sync::Arc;

use super::upload::UploadUseCase;
use super::workflow_status::WorkflowStatusUseCase;
use crate::domain::error::Result;
use crate::domain::upload::{UploadArtifact, UploadReceipt};
use crate::domain::workflow_run::WorkflowRunStatus;
use crate::infrastructure::azure::{BlobStore, WorkflowRunSource};

/// The two data loader operations. The HTTP service, the CLI talking to
/// Azure directly and the CLI talking to a running service all go through
/// this seam.
#[async_trait]
pub trait DataLoader: Send + Sync {
    async fn upload(&self, artifact: UploadArtifact) -> Result<UploadReceipt>;
    async fn workflow_status(&self, workflow_name: &str) -> Result<WorkflowRunStatus>;
}

pub struct AzureDataLoader {
    upload: UploadUseCase,
    status: WorkflowStatusUseCase,
}

impl AzureDataLoader {
    pub fn new(blob_store: Arc<dyn BlobStore>, runs: Arc<dyn WorkflowRunSource>) -> Self {
        Self {
            upload: UploadUseCase::new(blob_store),
            status: WorkflowStatusUseCase::new(runs),
        }
    }
}

#[async_trait]
impl DataLoader for AzureDataLoader {
    async fn upload(&self, artifact: UploadArtifact) -> Result<UploadReceipt> {
        self.upload.execute(artifact).await
    }

    async fn workflow_status(&self, workflow_name: &str) -> Result<WorkflowRunStatus> {
        self.status.execute(workflow_name).await
    }
}
