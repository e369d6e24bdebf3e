use crate::domain::error::{AppError, Result};
use crate::domain::upload::{UploadArtifact, UploadReceipt};
use crate::infrastructure::azure::BlobStore;
use std::sync::Arc;

pub struct UploadUseCase {
    blob_store: Arc<dyn BlobStore>,
}

impl UploadUseCase {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    pub async fn execute(&self, artifact: UploadArtifact) -> Result<UploadReceipt> {
        if artifact.filename.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Uploaded file has no filename".to_string(),
            ));
        }
        let container = artifact.container();
        tracing::info!(
            "Uploading {} (source={}) to container {}",
            artifact.filename,
            artifact.source,
            container
        );

        self.blob_store
            .put_blob(container, &artifact.filename, artifact.content)
            .await?;

        Ok(UploadReceipt {
            filename: artifact.filename,
            container: container.to_string(),
        })
    }
}
