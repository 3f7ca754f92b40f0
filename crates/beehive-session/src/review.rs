use beehive_api::BeehiveApi;
use beehive_core::ActionErrorKind;
use tracing::warn;

/// Resolves a rating authorization code to the review page of the rated work.
pub async fn resolve_review(api: &dyn BeehiveApi, code: &str) -> Result<String, ActionErrorKind> {
    api.review_work(code).await.map_err(|error| {
        warn!(error = %error, "review lookup failed");
        if error.is_not_found() {
            ActionErrorKind::ReviewWorkRecordNotFound
        } else if error.is_unauthorized() {
            ActionErrorKind::ReviewWorkUnauthorized
        } else {
            ActionErrorKind::ReviewUnexpectedError
        }
    })
}
