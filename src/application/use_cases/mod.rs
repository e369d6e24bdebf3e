pub mod data_loader;
pub mod fetch_leads;
pub mod upload;
pub mod workflow_status;
