pub mod error;
pub mod lead;
pub mod upload;
pub mod workflow_run;
