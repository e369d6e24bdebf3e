use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NO_RUNS_STATUS: &str = "No runs found";

/// One workflow run as listed by Azure Resource Manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub name: String,
    #[serde(default)]
    pub properties: WorkflowRunProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunProperties {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl WorkflowRun {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.properties
            .start_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|time| time.with_timezone(&Utc))
    }

    /// The run's error message: `error.message`, else `error.code`, else the
    /// raw error payload. `None` when the run recorded no error.
    pub fn error_message(&self) -> Option<String> {
        let error = self.properties.error.as_ref()?;
        match error {
            Value::Null => None,
            Value::String(message) => Some(message.clone()),
            Value::Object(fields) => fields
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| fields.get("code").and_then(Value::as_str))
                .map(str::to_string)
                .or_else(|| Some(error.to_string())),
            other => Some(other.to_string()),
        }
    }
}

/// Picks the most recent run by start time. Runs without a parseable start
/// time rank after timed runs; ties keep listing order.
pub fn latest_run(runs: &[WorkflowRun]) -> Option<&WorkflowRun> {
    let mut latest: Option<(&WorkflowRun, Option<DateTime<Utc>>)> = None;
    for run in runs {
        let started = run.started_at();
        latest = match latest {
            None => Some((run, started)),
            Some((best, best_started)) => {
                let newer = match (started, best_started) {
                    (Some(candidate), Some(current)) => candidate > current,
                    (Some(_), None) => true,
                    _ => false,
                };
                if newer {
                    Some((run, started))
                } else {
                    Some((best, best_started))
                }
            }
        };
    }
    latest.map(|(run, _)| run)
}

/// Status projection of a workflow's most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunStatus {
    pub status: String,
    pub error: Option<String>,
    pub name: Option<String>,
}

impl WorkflowRunStatus {
    pub fn no_runs() -> Self {
        Self {
            status: NO_RUNS_STATUS.to_string(),
            error: None,
            name: None,
        }
    }

    pub fn from_run(run: &WorkflowRun) -> Self {
        Self {
            status: run
                .properties
                .status
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            error: run.error_message(),
            name: Some(run.name.clone()),
        }
    }

    pub fn from_runs(runs: &[WorkflowRun]) -> Self {
        latest_run(runs)
            .map(Self::from_run)
            .unwrap_or_else(Self::no_runs)
    }

    pub fn outcome(&self) -> RunOutcome {
        if let Some(error) = &self.error {
            return RunOutcome::Errored(error.clone());
        }
        match self.status.as_str() {
            "Succeeded" => RunOutcome::Succeeded,
            "Running" | "Waiting" => RunOutcome::Running,
            NO_RUNS_STATUS => RunOutcome::NoRuns,
            _ => RunOutcome::Other,
        }
    }
}

/// How a status should be presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Running,
    Errored(String),
    NoRuns,
    Other,
}
