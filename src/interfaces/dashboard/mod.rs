//! Terminal dashboard over the leads API.

pub mod grid;
pub mod tui;

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::application::{FetchLeadsUseCase, LeadsLoad};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::DashboardConfig;
use crate::infrastructure::leads_api::LeadsApiClient;
use grid::LeadsGrid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    FetchFailed(String),
    NoData,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::FetchFailed(error) => write!(f, "Failed to fetch data: {}", error),
            Notice::NoData => f.write_str("No data available."),
        }
    }
}

/// Messages to show instead of (or before) the grid.
pub fn load_notices(load: &LeadsLoad) -> Vec<Notice> {
    let mut notices = Vec::new();
    if let Some(error) = &load.error {
        notices.push(Notice::FetchFailed(error.clone()));
    }
    if load.records.is_empty() {
        notices.push(Notice::NoData);
    }
    notices
}

fn write_edits(out: &mut impl Write, grid: &LeadsGrid) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, grid.edited())?;
    writeln!(out)?;
    Ok(())
}

/// Fetches once, then hands the rows to the grid. A configuration problem
/// is fatal; a fetch problem only produces notices.
pub async fn run(print_edits: bool) -> Result<()> {
    let config = DashboardConfig::load()?;
    let source = Arc::new(LeadsApiClient::new(config.api_url.clone()));
    let load = FetchLeadsUseCase::new(source).execute().await;

    let notices = load_notices(&load);
    for notice in &notices {
        match notice {
            Notice::FetchFailed(_) => tracing::error!("{}", notice),
            Notice::NoData => tracing::warn!("{}", notice),
        }
        eprintln!("{}", notice);
    }
    if load.records.is_empty() {
        return Ok(());
    }

    let grid = LeadsGrid::new(load.records);
    let grid = tokio::task::spawn_blocking(move || tui::run(grid))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    if grid.is_edited() {
        tracing::info!("{}", grid.edit_notice());
        if print_edits {
            write_edits(&mut std::io::stdout().lock(), &grid)?;
        }
    }
    Ok(())
}
