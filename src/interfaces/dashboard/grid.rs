//! Table model behind the leads dashboard.
//!
//! Holds the fetched records untouched next to an edited copy. Only the
//! `Status` column can change, and only to one of the `LeadStatus` values.

use crate::domain::error::{AppError, Result};
use crate::domain::lead::{LeadRecord, LeadStatus, STATUS_FIELD};
use serde_json::Value;

pub const MIN_COLUMN_WIDTH: u16 = 4;
pub const MAX_COLUMN_WIDTH: u16 = 60;
const INITIAL_WIDTH_CAP: u16 = 30;

pub const EDITED_NOTICE: &str = "Status updated! (Note: This does not persist to the backend API)";
pub const EDIT_HINT: &str = "Edit the 'Status' column directly in the table above.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridColumn {
    pub name: String,
    pub width: u16,
    pub editable: bool,
}

pub struct LeadsGrid {
    source: Vec<LeadRecord>,
    edited: Vec<LeadRecord>,
    columns: Vec<GridColumn>,
    filter: String,
}

pub fn cell_text(record: &LeadRecord, column: &str) -> String {
    match record.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn clamp_width(width: usize) -> u16 {
    (width.min(MAX_COLUMN_WIDTH as usize) as u16).max(MIN_COLUMN_WIDTH)
}

impl LeadsGrid {
    pub fn new(records: Vec<LeadRecord>) -> Self {
        let mut names: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !names.iter().any(|name| name == key) {
                    names.push(key.clone());
                }
            }
        }
        if !names.iter().any(|name| name == STATUS_FIELD) {
            names.push(STATUS_FIELD.to_string());
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let widest = records
                    .iter()
                    .map(|record| cell_text(record, &name).chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0);
                GridColumn {
                    editable: name == STATUS_FIELD,
                    width: clamp_width(widest + 2).min(INITIAL_WIDTH_CAP),
                    name,
                }
            })
            .collect();

        Self {
            edited: records.clone(),
            source: records,
            columns,
            filter: String::new(),
        }
    }

    pub fn columns(&self) -> &[GridColumn] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.edited.len()
    }

    pub fn cell(&self, row: usize, column: &str) -> String {
        self.edited
            .get(row)
            .map(|record| cell_text(record, column))
            .unwrap_or_default()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    /// Indices of rows with any cell containing the filter text,
    /// case-insensitively. Every row when the filter is empty.
    pub fn visible_rows(&self) -> Vec<usize> {
        let needle = self.filter.trim().to_lowercase();
        (0..self.edited.len())
            .filter(|&row| {
                needle.is_empty()
                    || self.columns.iter().any(|column| {
                        self.cell(row, &column.name)
                            .to_lowercase()
                            .contains(&needle)
                    })
            })
            .collect()
    }

    pub fn resize_column(&mut self, index: usize, delta: i32) {
        if let Some(column) = self.columns.get_mut(index) {
            let width = (column.width as i32 + delta).max(0) as usize;
            column.width = clamp_width(width);
        }
    }

    pub fn status_of(&self, row: usize) -> Option<LeadStatus> {
        self.edited
            .get(row)?
            .get(STATUS_FIELD)?
            .as_str()?
            .parse()
            .ok()
    }

    pub fn set_status(&mut self, row: usize, status: LeadStatus) -> Result<()> {
        let record = self
            .edited
            .get_mut(row)
            .ok_or_else(|| AppError::ValidationError(format!("Row {} does not exist", row)))?;
        record.insert(
            STATUS_FIELD.to_string(),
            Value::String(status.as_str().to_string()),
        );
        Ok(())
    }

    /// Free-form cell edit. Rejected unless it targets the `Status` column
    /// with one of the allowed values.
    pub fn set_cell(&mut self, row: usize, column: &str, value: &str) -> Result<()> {
        if column != STATUS_FIELD {
            return Err(AppError::ValidationError(format!(
                "Column '{}' is read-only",
                column
            )));
        }
        let status: LeadStatus = value.parse()?;
        self.set_status(row, status)
    }

    pub fn source(&self) -> &[LeadRecord] {
        &self.source
    }

    pub fn edited(&self) -> &[LeadRecord] {
        &self.edited
    }

    pub fn is_edited(&self) -> bool {
        self.source != self.edited
    }

    pub fn edit_notice(&self) -> &'static str {
        if self.is_edited() {
            EDITED_NOTICE
        } else {
            EDIT_HINT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<LeadRecord> {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> LeadsGrid {
        LeadsGrid::new(records(json!([
            {"Company": "Contoso", "Owner": "Avery", "Status": "InProgress", "Score": 72},
            {"Company": "Fabrikam", "Owner": "Jordan", "Status": "Declined", "Score": null},
            {"Company": "Northwind", "Owner": "Sam", "Status": "InProgress", "Region": "EMEA"}
        ])))
    }

    #[test]
    fn test_one_row_per_record_and_union_of_columns() {
        let grid = sample();
        assert_eq!(grid.row_count(), 3);
        let names: Vec<&str> = grid.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Company", "Owner", "Status", "Score", "Region"]);
        assert_eq!(grid.cell(0, "Score"), "72");
        assert_eq!(grid.cell(1, "Score"), "");
        assert_eq!(grid.cell(0, "Region"), "");
    }

    #[test]
    fn test_only_status_column_is_editable() {
        let grid = sample();
        let editable: Vec<&str> = grid
            .columns()
            .iter()
            .filter(|c| c.editable)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(editable, vec!["Status"]);
    }

    #[test]
    fn test_status_column_added_when_missing() {
        let grid = LeadsGrid::new(records(json!([{"Company": "Contoso"}])));
        assert!(grid.columns().iter().any(|c| c.name == "Status"));
        assert!(!grid.is_edited());
    }

    #[test]
    fn test_status_edit_changes_copy_not_source() {
        let mut grid = sample();
        let before = grid.source().to_vec();

        grid.set_cell(0, "Status", "Opportunity Created").unwrap();

        assert_eq!(grid.status_of(0), Some(LeadStatus::OpportunityCreated));
        assert_eq!(grid.source(), before.as_slice());
        assert_eq!(grid.source()[0]["Status"], json!("InProgress"));
        assert!(grid.is_edited());
        assert_eq!(grid.edit_notice(), EDITED_NOTICE);
    }

    #[test]
    fn test_values_outside_enumeration_are_rejected() {
        let mut grid = sample();
        for value in ["Won", "", "declined", "Opportunity created"] {
            assert!(grid.set_cell(0, "Status", value).is_err(), "{:?}", value);
        }
        assert!(!grid.is_edited());
        assert_eq!(grid.edit_notice(), EDIT_HINT);
    }

    #[test]
    fn test_other_columns_are_read_only() {
        let mut grid = sample();
        let err = grid.set_cell(0, "Company", "Litware").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(grid.cell(0, "Company"), "Contoso");
    }

    #[test]
    fn test_setting_same_status_is_not_an_edit() {
        let mut grid = sample();
        grid.set_status(1, LeadStatus::Declined).unwrap();
        assert!(!grid.is_edited());
    }

    #[test]
    fn test_filter_matches_any_cell_case_insensitively() {
        let mut grid = sample();
        grid.set_filter("emea");
        assert_eq!(grid.visible_rows(), vec![2]);
        grid.set_filter("inprogress");
        assert_eq!(grid.visible_rows(), vec![0, 2]);
        grid.set_filter("");
        assert_eq!(grid.visible_rows(), vec![0, 1, 2]);
    }

    #[test]
    fn test_resize_is_clamped() {
        let mut grid = sample();
        grid.resize_column(0, -100);
        assert_eq!(grid.columns()[0].width, MIN_COLUMN_WIDTH);
        grid.resize_column(0, 500);
        assert_eq!(grid.columns()[0].width, MAX_COLUMN_WIDTH);
        grid.resize_column(99, 3);
    }

    #[test]
    fn test_empty_dataset_renders_no_rows() {
        let grid = LeadsGrid::new(Vec::new());
        assert_eq!(grid.row_count(), 0);
        assert!(grid.visible_rows().is_empty());
    }
}
