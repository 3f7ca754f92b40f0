use beehive_api::BeehiveApi;
use beehive_core::{ActionErrorKind, UserRatings};
use tracing::warn;

/// Submits every rated subject, one request at a time in subject-key order.
///
/// Nothing is sent unless the map is complete. A failing request stops the
/// batch; subjects accepted before it stay recorded server-side.
pub async fn submit_ratings(
    api: &dyn BeehiveApi,
    ratings: &UserRatings,
    authorization_code: &str,
) -> Result<usize, ActionErrorKind> {
    let requests = ratings.rating_requests(authorization_code)?;
    let mut submitted = 0;
    for request in requests {
        let subject = request.subject;
        if let Err(error) = api.submit_rating(request).await {
            warn!(subject = %subject, submitted, error = %error, "rating submission failed");
            return Err(ActionErrorKind::Rating);
        }
        submitted += 1;
    }
    Ok(submitted)
}
