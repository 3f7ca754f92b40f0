use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beehive_core::RatingRequest;
use beehive_domain::{AutomatedReview, WorkId, WorkRecord, WorkType};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::envelope::{decode_failure, decode_success};
use crate::error::ApiError;
use crate::models::{
    DetachedRequest, FinishWorkRequest, ReviewWorkResponse, SkipWorkRequest, StartWorkRequest,
    StartWorkResponse, WorkFetch,
};
use crate::tokens::{TokenPair, TokenStore};
use crate::BeehiveApi;

pub const DEFAULT_API_URL: &str = "https://api.beehive.example/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_url: String,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
struct RequestSpec {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
    authorized: bool,
}

impl RequestSpec {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authorized: true,
        }
    }

    fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            authorized: true,
        }
    }

    fn unauthorized(mut self) -> Self {
        self.authorized = false;
        self
    }
}

struct ClientInner {
    config: ApiConfig,
    client: Client,
    tokens: Arc<dyn TokenStore>,
    refresh_lock: Mutex<()>,
}

impl ClientInner {
    fn endpoint(&self, path: &str) -> String {
        let base = self.config.api_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    async fn send_once(
        &self,
        spec: &RequestSpec,
        access_token: Option<&str>,
    ) -> Result<(StatusCode, String), ApiError> {
        let mut request = self
            .client
            .request(spec.method.clone(), self.endpoint(&spec.path));
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| ApiError::Transport(error.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| ApiError::Transport(format!("response read failed: {error}")))?;
        Ok((status, body))
    }

    /// Sends the request, refreshing the token pair and retrying once on 401.
    async fn execute<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<Option<T>, ApiError> {
        let tokens = if spec.authorized {
            Some(self.tokens.load()?.ok_or(ApiError::NotSignedIn)?)
        } else {
            None
        };

        let access_token = tokens.as_ref().map(|pair| pair.access_token.as_str());
        let (mut status, mut body) = self.send_once(&spec, access_token).await?;

        if status == StatusCode::UNAUTHORIZED {
            if let Some(stale) = tokens.as_ref() {
                debug!(path = %spec.path, "access token rejected; refreshing");
                let fresh = self.refresh(stale).await?;
                (status, body) = self.send_once(&spec, Some(&fresh.access_token)).await?;
            }
        }

        if !status.is_success() {
            return Err(decode_failure(status.as_u16(), &body));
        }
        decode_success(status.as_u16(), &body)
    }

    async fn refresh(&self, stale: &TokenPair) -> Result<TokenPair, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while this one waited for the lock.
        if let Some(current) = self.tokens.load()? {
            if current.access_token != stale.access_token {
                return Ok(current);
            }
        }

        let spec = RequestSpec::post(
            "auth/refresh",
            json!({ "refresh_token": stale.refresh_token }),
        )
        .unauthorized();
        let (status, body) = self.send_once(&spec, None).await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "token refresh rejected");
            return Err(decode_failure(status.as_u16(), &body));
        }
        let fresh: TokenPair = decode_success(status.as_u16(), &body)?.ok_or_else(|| {
            ApiError::Decode("token refresh response did not include tokens".to_owned())
        })?;
        self.tokens.save(&fresh)?;
        Ok(fresh)
    }
}

/// [`BeehiveApi`] over HTTPS with bearer tokens from a [`TokenStore`].
#[derive(Clone)]
pub struct ReqwestBeehiveApi {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for ReqwestBeehiveApi {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReqwestBeehiveApi")
            .field("config", &self.inner.config)
            .field("tokens", &"<redacted>")
            .finish()
    }
}

impl ReqwestBeehiveApi {
    pub fn new(config: ApiConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        if config.api_url.trim().is_empty() {
            return Err(ApiError::Configuration(
                "Beehive API URL cannot be empty.".to_owned(),
            ));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("beehive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| {
                ApiError::Configuration(format!("failed to build Beehive HTTP client: {error}"))
            })?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                client,
                tokens,
                refresh_lock: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::Configuration(
                "Sign-in requires an email address and a password.".to_owned(),
            ));
        }
        let spec = RequestSpec::post(
            "auth/token",
            json!({ "email": email, "password": password }),
        )
        .unauthorized();
        let tokens: TokenPair = self.inner.execute(spec).await?.ok_or_else(|| {
            ApiError::Decode("sign-in response did not include tokens".to_owned())
        })?;
        self.inner.tokens.save(&tokens)
    }

    pub fn sign_out(&self) -> Result<(), ApiError> {
        self.inner.tokens.clear()
    }

    pub fn is_signed_in(&self) -> Result<bool, ApiError> {
        Ok(self.inner.tokens.load()?.is_some())
    }

    async fn fetch(&self, spec: RequestSpec) -> Result<WorkFetch, ApiError> {
        match self.inner.execute::<WorkFetch>(spec).await {
            Ok(fetch) => Ok(fetch.unwrap_or_default()),
            Err(error) if error.is_not_found() => Ok(WorkFetch::default()),
            Err(error) => Err(error),
        }
    }

    async fn execute_unit(&self, spec: RequestSpec) -> Result<(), ApiError> {
        self.inner.execute::<Value>(spec).await.map(|_| ())
    }

    fn detach(&self, spec: RequestSpec) -> DetachedRequest {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.execute::<Value>(spec).await.map(|_| ()) });
        Box::pin(async move {
            handle
                .await
                .map_err(|error| ApiError::Transport(format!("detached request aborted: {error}")))?
        })
    }
}

fn work_path(work_id: &WorkId, action: &str) -> String {
    format!("work/{}/{action}", work_id.as_str())
}

/// Review codes travel as a single path segment, so only URL-safe characters
/// are accepted.
fn review_path(code: &str) -> Result<String, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ApiError::Configuration(
            "Review code cannot be empty.".to_owned(),
        ));
    }
    if !code
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(ApiError::Configuration(format!(
            "Review code '{code}' may only contain letters, digits, '-' and '_'."
        )));
    }
    Ok(format!("review/{code}"))
}

#[async_trait]
impl BeehiveApi for ReqwestBeehiveApi {
    async fn fetch_available_work(&self, exclude: Option<&WorkId>) -> Result<WorkFetch, ApiError> {
        let mut spec = RequestSpec::get("work");
        if let Some(exclude) = exclude {
            spec.query.push(("exclude", exclude.as_str().to_owned()));
        }
        self.fetch(spec).await
    }

    async fn fetch_work(&self, work_id: &WorkId) -> Result<WorkFetch, ApiError> {
        self.fetch(RequestSpec::get(format!("work/{}", work_id.as_str())))
            .await
    }

    async fn start_work(
        &self,
        work_id: &WorkId,
        request: StartWorkRequest,
    ) -> Result<Option<WorkRecord>, ApiError> {
        let body = serde_json::to_value(&request)
            .map_err(|error| ApiError::Decode(format!("failed to encode start request: {error}")))?;
        let response: Option<StartWorkResponse> = self
            .inner
            .execute(RequestSpec::post(work_path(work_id, "start"), body))
            .await?;
        Ok(response.and_then(|response| response.record))
    }

    fn skip_work(&self, work_id: &WorkId, request: SkipWorkRequest) -> DetachedRequest {
        let body = json!({
            "skipped_at_ms": request.skipped_at_ms,
            "timezone": request.timezone,
        });
        self.detach(RequestSpec::post(work_path(work_id, "skip"), body))
    }

    fn checkpoint_work(&self, work_id: &WorkId, duration_ms: u64) -> DetachedRequest {
        self.detach(RequestSpec::post(
            work_path(work_id, "checkpoint"),
            json!({ "duration_ms": duration_ms }),
        ))
    }

    async fn cancel_work(&self, work_id: &WorkId) -> Result<(), ApiError> {
        self.execute_unit(RequestSpec::post(work_path(work_id, "cancel"), json!({})))
            .await
    }

    async fn finish_work(
        &self,
        work_id: &WorkId,
        request: FinishWorkRequest,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_value(&request).map_err(|error| {
            ApiError::Decode(format!("failed to encode finish request: {error}"))
        })?;
        self.execute_unit(RequestSpec::post(work_path(work_id, "finish"), body))
            .await
    }

    async fn analyze_work(
        &self,
        work_id: &WorkId,
        solution_url: &str,
    ) -> Result<AutomatedReview, ApiError> {
        self.inner
            .execute::<AutomatedReview>(RequestSpec::post(
                work_path(work_id, "analyze"),
                json!({ "solution_url": solution_url }),
            ))
            .await?
            .ok_or_else(|| ApiError::Decode("analysis response did not include a review".to_owned()))
    }

    async fn submit_rating(&self, request: RatingRequest) -> Result<(), ApiError> {
        let body = serde_json::to_value(&request).map_err(|error| {
            ApiError::Decode(format!("failed to encode rating request: {error}"))
        })?;
        self.execute_unit(RequestSpec::post("ratings", body)).await
    }

    async fn correct_work_type(
        &self,
        work_id: &WorkId,
        work_type: WorkType,
    ) -> Result<(), ApiError> {
        self.execute_unit(RequestSpec::post(
            work_path(work_id, "work-type"),
            json!({ "work_type": work_type }),
        ))
        .await
    }

    async fn review_work(&self, code: &str) -> Result<String, ApiError> {
        let response: ReviewWorkResponse = self
            .inner
            .execute(RequestSpec::get(review_path(code)?))
            .await?
            .ok_or_else(|| {
                ApiError::Decode("review response did not include a redirect URL".to_owned())
            })?;
        Ok(response.redirect_url)
    }
}
