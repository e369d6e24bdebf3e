pub mod blob_store;
pub mod credential;
pub mod logic_apps;

#[cfg(test)]
pub(crate) mod test_support;

pub use blob_store::{AzureBlobStore, BlobStore};
pub use credential::{AccessToken, ChainedCredential, TokenCredential};
pub use logic_apps::{LogicAppsClient, WorkflowRunSource};

pub const STORAGE_API_VERSION: &str = "2023-11-03";
pub const LOGIC_API_VERSION: &str = "2016-06-01";
