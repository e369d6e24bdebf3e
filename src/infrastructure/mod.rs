#[path = "config/mod.rs"]
pub mod config_mod;
pub use config_mod as config;
pub mod azure;
pub mod leads_api;
pub mod loader_service;
