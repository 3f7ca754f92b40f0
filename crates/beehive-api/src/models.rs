use std::future::Future;
use std::pin::Pin;

use beehive_domain::{ReviewOutcome, WorkItem, WorkRecord};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Outcome of a request that was issued without the caller waiting on it.
pub type DetachedRequest = Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'static>>;

/// Payload of a work fetch. Both fields empty means the queue is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkFetch {
    #[serde(default)]
    pub work: Option<WorkItem>,
    #[serde(default)]
    pub record: Option<WorkRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkRequest {
    pub started_at_ms: i64,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipWorkRequest {
    pub skipped_at_ms: i64,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinishOutcome {
    Solution { solution_url: String },
    Feedback { feedback: String },
    Review { decision: ReviewOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishWorkRequest {
    pub duration_ms: u64,
    #[serde(flatten)]
    pub outcome: FinishOutcome,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StartWorkResponse {
    #[serde(default)]
    pub record: Option<WorkRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewWorkResponse {
    pub redirect_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finish_request_flattens_outcome() {
        let request = FinishWorkRequest {
            duration_ms: 60_000,
            outcome: FinishOutcome::Review {
                decision: ReviewOutcome::Approve,
            },
        };
        assert_eq!(
            serde_json::to_value(&request).expect("serialize finish request"),
            json!({ "duration_ms": 60_000, "kind": "review", "decision": "approve" })
        );
    }

    #[test]
    fn empty_fetch_payload_means_no_work() {
        let fetch: WorkFetch = serde_json::from_value(json!({})).expect("decode fetch");
        assert_eq!(fetch, WorkFetch::default());
    }
}
