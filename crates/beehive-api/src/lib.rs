//! REST gateway to the Beehive backend.

mod client;
mod envelope;
mod error;
mod models;
mod tokens;

pub use client::{ApiConfig, ReqwestBeehiveApi, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use envelope::ApiEnvelope;
pub use error::ApiError;
pub use models::{
    DetachedRequest, FinishOutcome, FinishWorkRequest, SkipWorkRequest, StartWorkRequest,
    WorkFetch,
};
pub use tokens::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};

use async_trait::async_trait;
use beehive_core::RatingRequest;
use beehive_domain::{AutomatedReview, WorkId, WorkRecord, WorkType};

/// Operations the work-session controller needs from the backend.
///
/// Every call resolves to a domain payload or an [`ApiError`]. Methods that
/// return [`DetachedRequest`] issue the request before returning; awaiting the
/// returned future only observes its outcome.
#[async_trait]
pub trait BeehiveApi: Send + Sync {
    async fn fetch_available_work(&self, exclude: Option<&WorkId>) -> Result<WorkFetch, ApiError>;

    async fn fetch_work(&self, work_id: &WorkId) -> Result<WorkFetch, ApiError>;

    async fn start_work(
        &self,
        work_id: &WorkId,
        request: StartWorkRequest,
    ) -> Result<Option<WorkRecord>, ApiError>;

    fn skip_work(&self, work_id: &WorkId, request: SkipWorkRequest) -> DetachedRequest;

    fn checkpoint_work(&self, work_id: &WorkId, duration_ms: u64) -> DetachedRequest;

    async fn cancel_work(&self, work_id: &WorkId) -> Result<(), ApiError>;

    async fn finish_work(&self, work_id: &WorkId, request: FinishWorkRequest)
        -> Result<(), ApiError>;

    async fn analyze_work(
        &self,
        work_id: &WorkId,
        solution_url: &str,
    ) -> Result<AutomatedReview, ApiError>;

    async fn submit_rating(&self, request: RatingRequest) -> Result<(), ApiError>;

    async fn correct_work_type(&self, work_id: &WorkId, work_type: WorkType)
        -> Result<(), ApiError>;

    /// Resolves a rating authorization code to the page where the rated work
    /// can be reviewed.
    async fn review_work(&self, code: &str) -> Result<String, ApiError>;
}
