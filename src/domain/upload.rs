use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE: &str = "others";
pub const DEFAULT_CONTAINER: &str = "dsilas-others";

/// Source tag → destination container. Tags not listed here go to the
/// `others` container.
pub const CONTAINER_MAP: [(&str, &str); 3] = [
    ("founderhub", "dsilas-foundershub"),
    ("crunchbase", "dsilas-crunchbase"),
    (DEFAULT_SOURCE, DEFAULT_CONTAINER),
];

pub fn container_for_source(source: &str) -> &'static str {
    CONTAINER_MAP
        .iter()
        .find(|(tag, _)| *tag == source)
        .map(|(_, container)| *container)
        .unwrap_or(DEFAULT_CONTAINER)
}

#[derive(Debug, Clone)]
pub struct UploadArtifact {
    pub filename: String,
    pub source: String,
    pub content: Vec<u8>,
}

impl UploadArtifact {
    pub fn new(filename: impl Into<String>, source: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
            content,
        }
    }

    pub fn container(&self) -> &'static str {
        container_for_source(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub filename: String,
    pub container: String,
}

/// Body returned by `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
}

impl From<&UploadReceipt> for UploadResponse {
    fn from(receipt: &UploadReceipt) -> Self {
        Self {
            success: true,
            filename: receipt.filename.clone(),
        }
    }
}
