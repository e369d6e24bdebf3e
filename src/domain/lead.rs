use crate::domain::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A lead as returned by the leads API. The shape is owned by the API, so
/// records stay untyped and keep the API's field order.
pub type LeadRecord = Map<String, Value>;

pub const STATUS_FIELD: &str = "Status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStatus {
    InProgress,
    Declined,
    #[serde(rename = "Opportunity Created")]
    OpportunityCreated,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 3] = [
        LeadStatus::InProgress,
        LeadStatus::Declined,
        LeadStatus::OpportunityCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::InProgress => "InProgress",
            LeadStatus::Declined => "Declined",
            LeadStatus::OpportunityCreated => "Opportunity Created",
        }
    }

    /// Position in `ALL`, used by pickers to preselect the current value.
    pub fn index(&self) -> usize {
        match self {
            LeadStatus::InProgress => 0,
            LeadStatus::Declined => 1,
            LeadStatus::OpportunityCreated => 2,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "'{}' is not a valid status; expected one of: InProgress, Declined, Opportunity Created",
                    value
                ))
            })
    }
}

/// Result of a lead fetch. A failure is a value, not an `Err`, and
/// serializes as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FetchOutcome {
    Failed { error: String },
    Data(Value),
}

impl FetchOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        FetchOutcome::Failed {
            error: error.into(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchOutcome::Failed { error } => Some(error),
            FetchOutcome::Data(_) => None,
        }
    }

    /// Flattens the payload into rows: an array yields one record per
    /// element, a lone object yields one record, anything else yields none.
    /// Non-object array elements land in a single `value` field.
    pub fn into_records(self) -> Vec<LeadRecord> {
        match self {
            FetchOutcome::Failed { .. } => Vec::new(),
            FetchOutcome::Data(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                })
                .collect(),
            FetchOutcome::Data(Value::Object(map)) => vec![map],
            FetchOutcome::Data(_) => Vec::new(),
        }
    }
}
