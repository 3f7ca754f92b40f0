use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use beehive_api::{
    ApiConfig, ApiError, BeehiveApi, MemoryTokenStore, ReqwestBeehiveApi, TokenPair, TokenStore,
    WorkFetch,
};
use beehive_core::RatingRequest;
use beehive_domain::{RatingSubject, WorkId};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const FRESH_TOKEN: &str = "fresh-access";

#[derive(Clone, Default)]
struct MockState {
    refresh_calls: Arc<Mutex<u32>>,
    checkpoints: Arc<Mutex<Vec<(String, u64)>>>,
    ratings: Arc<Mutex<Vec<Value>>>,
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "status": "error", "error": "unauthorized" })),
    )
}

async fn refresh(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *state.refresh_calls.lock().expect("refresh calls lock") += 1;
    if body["refresh_token"] != "refresh-1" {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "data": { "access_token": FRESH_TOKEN, "refresh_token": "refresh-2" }
        })),
    )
}

async fn available_work(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if bearer(&headers).as_deref() != Some(FRESH_TOKEN) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "data": {
                "work": {
                    "id": "work-7",
                    "title": "Document the CLI",
                    "priority": 2
                }
            }
        })),
    )
}

async fn missing_work() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": "error", "error": "work_not_found" })),
    )
}

async fn analyze() -> (StatusCode, Json<Value>) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "status": "error", "error": "rate_limited" })),
    )
}

async fn always_unauthorized() -> (StatusCode, Json<Value>) {
    unauthorized()
}

async fn checkpoint(
    State(state): State<MockState>,
    Path(work_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let duration = body["duration_ms"].as_u64().unwrap_or_default();
    state
        .checkpoints
        .lock()
        .expect("checkpoints lock")
        .push((work_id, duration));
    Json(json!({ "status": "ok" }))
}

async fn rating(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.ratings.lock().expect("ratings lock").push(body);
    Json(json!({ "status": "ok", "data": null }))
}

async fn spawn_mock_server() -> (String, MockState, oneshot::Sender<()>) {
    let state = MockState::default();
    let app = Router::new()
        .route("/auth/refresh", post(refresh))
        .route("/work", get(available_work))
        .route("/work/{work_id}", get(missing_work))
        .route("/work/{work_id}/analyze", post(analyze))
        .route("/work/{work_id}/cancel", post(always_unauthorized))
        .route("/work/{work_id}/checkpoint", post(checkpoint))
        .route("/ratings", post(rating))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server listener");
    let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("run mock server");
    });
    (format!("http://{address}"), state, shutdown_tx)
}

fn client(base_url: String, tokens: Arc<MemoryTokenStore>) -> ReqwestBeehiveApi {
    ReqwestBeehiveApi::new(
        ApiConfig {
            api_url: base_url,
            request_timeout: Duration::from_secs(3),
        },
        tokens,
    )
    .expect("build client")
}

fn stale_tokens() -> Arc<MemoryTokenStore> {
    Arc::new(MemoryTokenStore::with_tokens(TokenPair {
        access_token: "stale-access".to_owned(),
        refresh_token: "refresh-1".to_owned(),
    }))
}

#[tokio::test]
async fn unauthorized_request_refreshes_once_and_retries() {
    let (base_url, state, shutdown) = spawn_mock_server().await;
    let tokens = stale_tokens();
    let api = client(base_url, Arc::clone(&tokens));

    let fetch = api
        .fetch_available_work(None)
        .await
        .expect("fetch after refresh");
    assert_eq!(
        fetch.work.map(|work| work.id),
        Some(WorkId::new("work-7"))
    );
    assert_eq!(*state.refresh_calls.lock().expect("refresh calls lock"), 1);
    assert_eq!(
        tokens.load().expect("load tokens").map(|pair| pair.refresh_token),
        Some("refresh-2".to_owned())
    );

    let _ = shutdown.send(());
}

#[tokio::test]
async fn second_unauthorized_is_surfaced() {
    let (base_url, state, shutdown) = spawn_mock_server().await;
    let api = client(base_url, stale_tokens());

    let error = api
        .cancel_work(&WorkId::new("work-7"))
        .await
        .expect_err("cancel keeps failing with 401");
    assert_eq!(error.status(), Some(401));
    assert_eq!(error.error_code(), Some("unauthorized"));
    assert_eq!(*state.refresh_calls.lock().expect("refresh calls lock"), 1);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn not_found_work_fetch_means_no_work() {
    let (base_url, _state, shutdown) = spawn_mock_server().await;
    let api = client(base_url, stale_tokens());

    let fetch = api
        .fetch_work(&WorkId::new("gone"))
        .await
        .expect("404 is not an error");
    assert_eq!(fetch, WorkFetch::default());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn analyze_rate_limit_keeps_status() {
    let (base_url, _state, shutdown) = spawn_mock_server().await;
    let api = client(base_url, stale_tokens());

    let error = api
        .analyze_work(&WorkId::new("work-7"), "github.com/o/r/pull/1")
        .await
        .expect_err("analysis is rate limited");
    assert!(error.is_rate_limited());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn detached_checkpoint_reaches_server_and_rating_omits_missing_feedback() {
    let (base_url, state, shutdown) = spawn_mock_server().await;
    let tokens = Arc::new(MemoryTokenStore::with_tokens(TokenPair {
        access_token: FRESH_TOKEN.to_owned(),
        refresh_token: "refresh-1".to_owned(),
    }));
    let api = client(base_url, tokens);

    api.checkpoint_work(&WorkId::new("work-7"), 90_000)
        .await
        .expect("checkpoint accepted");
    assert_eq!(
        state.checkpoints.lock().expect("checkpoints lock").clone(),
        vec![("work-7".to_owned(), 90_000)]
    );

    api.submit_rating(RatingRequest {
        subject: RatingSubject::WorkDescription,
        score: 4,
        feedback: None,
        code: "code-1".to_owned(),
    })
    .await
    .expect("rating accepted");
    assert_eq!(
        state.ratings.lock().expect("ratings lock").clone(),
        vec![json!({ "subject": "work_description", "score": 4, "code": "code-1" })]
    );

    let _ = shutdown.send(());
}

#[tokio::test]
async fn requests_without_tokens_fail_before_sending() {
    let api = client(
        "http://127.0.0.1:9".to_owned(),
        Arc::new(MemoryTokenStore::default()),
    );
    let error = api
        .fetch_available_work(None)
        .await
        .expect_err("no tokens stored");
    assert_eq!(error, ApiError::NotSignedIn);
}
