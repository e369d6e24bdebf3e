pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use app::{build_azure_loader, init_tracing, run_dashboard, run_loader_cli, run_loader_server};
pub use domain::error::{AppError, Result};
