pub mod use_cases;

pub use use_cases::data_loader::{AzureDataLoader, DataLoader};
pub use use_cases::fetch_leads::{FetchLeadsUseCase, LeadsLoad};
pub use use_cases::upload::UploadUseCase;
pub use use_cases::workflow_status::WorkflowStatusUseCase;
