use crate::domain::lead::{FetchOutcome, LeadRecord};
use crate::infrastructure::leads_api::LeadSource;
use std::sync::Arc;

/// What the dashboard gets to show: the records, plus the fetch error if
/// there was one. A failed fetch always comes with zero records.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadsLoad {
    pub records: Vec<LeadRecord>,
    pub error: Option<String>,
}

pub struct FetchLeadsUseCase {
    source: Arc<dyn LeadSource>,
}

impl FetchLeadsUseCase {
    pub fn new(source: Arc<dyn LeadSource>) -> Self {
        Self { source }
    }

    pub async fn execute(&self) -> LeadsLoad {
        let outcome = self.source.fetch_leads().await;
        match outcome {
            FetchOutcome::Failed { error } => LeadsLoad {
                records: Vec::new(),
                error: Some(error),
            },
            data => LeadsLoad {
                records: data.into_records(),
                error: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Canned(FetchOutcome);

    #[async_trait]
    impl LeadSource for Canned {
        async fn fetch_leads(&self) -> FetchOutcome {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_yields_error_and_no_rows() {
        let load = FetchLeadsUseCase::new(Arc::new(Canned(FetchOutcome::failed(
            "HTTP status server error (503 Service Unavailable)",
        ))))
        .execute()
        .await;
        assert!(load.records.is_empty());
        assert!(load.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_array_yields_one_row_per_element() {
        let load = FetchLeadsUseCase::new(Arc::new(Canned(FetchOutcome::Data(json!([
            {"Company": "A"},
            {"Company": "B"}
        ])))))
        .execute()
        .await;
        assert_eq!(load.records.len(), 2);
        assert_eq!(load.error, None);
    }
}
