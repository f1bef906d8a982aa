//! Mock Baidu speech backend for integration tests
//!
//! Serves the OAuth token endpoint and the short-text synthesis endpoint.
//! Each synthesized clip embeds a sequence number, so tests can tell a fresh
//! synthesis from a cached one.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing,
};
use tokio_util::sync::CancellationToken;
use url::Url;

/// How the mock answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Issue tokens and return MP3 audio
    Healthy,
    /// Reject the client credentials
    RejectCredentials,
    /// Issue tokens but answer synthesis with a JSON error body
    SynthesisError,
}

pub struct MockBaidu {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockBaiduState>,
}

struct MockBaiduState {
    behavior: Behavior,
    delay: Duration,
    token_count: AtomicU32,
    synthesis_count: AtomicU32,
    last_query: Mutex<HashMap<String, String>>,
}

impl MockBaidu {
    pub const CLIENT_ID: &'static str = "test-client-id";
    pub const CLIENT_SECRET: &'static str = "test-client-secret";
    pub const TOKEN: &'static str = "24.mock-access-token";

    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(Behavior::Healthy, Duration::ZERO).await
    }

    pub async fn start_with(behavior: Behavior) -> anyhow::Result<Self> {
        Self::start_inner(behavior, Duration::ZERO).await
    }

    /// Healthy mock that holds every synthesis response for `delay`
    pub async fn start_slow(delay: Duration) -> anyhow::Result<Self> {
        Self::start_inner(Behavior::Healthy, delay).await
    }

    async fn start_inner(behavior: Behavior, delay: Duration) -> anyhow::Result<Self> {
        let state = Arc::new(MockBaiduState {
            behavior,
            delay,
            token_count: AtomicU32::new(0),
            synthesis_count: AtomicU32::new(0),
            last_query: Mutex::new(HashMap::new()),
        });

        let app = Router::new()
            .route("/oauth/2.0/token", routing::post(handle_token))
            .route("/text2audio", routing::get(handle_synthesis))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await
                    .ok();
            }
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn token_url(&self) -> Url {
        Url::parse(&format!("http://{}/oauth/2.0/token", self.addr)).unwrap()
    }

    pub fn synthesis_url(&self) -> Url {
        Url::parse(&format!("http://{}/text2audio", self.addr)).unwrap()
    }

    pub fn token_count(&self) -> u32 {
        self.state.token_count.load(Ordering::SeqCst)
    }

    pub fn synthesis_count(&self) -> u32 {
        self.state.synthesis_count.load(Ordering::SeqCst)
    }

    /// Query parameters of the most recent synthesis request
    pub fn last_query(&self) -> HashMap<String, String> {
        self.state.last_query.lock().unwrap().clone()
    }

    /// Audio the mock returns for the `n`th synthesis (1-based) of `text`
    pub fn audio_for(n: u32, text: &str) -> Vec<u8> {
        format!("ID3-mock-{n}-{text}").into_bytes()
    }
}

impl Drop for MockBaidu {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_token(
    State(state): State<Arc<MockBaiduState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.token_count.fetch_add(1, Ordering::SeqCst);

    let valid = query.get("grant_type").map(String::as_str) == Some("client_credentials")
        && query.get("client_id").map(String::as_str) == Some(MockBaidu::CLIENT_ID)
        && query.get("client_secret").map(String::as_str) == Some(MockBaidu::CLIENT_SECRET);

    if state.behavior == Behavior::RejectCredentials || !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "unknown client id",
            })),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "access_token": MockBaidu::TOKEN,
        "expires_in": 2_592_000,
        "scope": "audio_tts_post",
    }))
    .into_response()
}

async fn handle_synthesis(
    State(state): State<Arc<MockBaiduState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let n = state.synthesis_count.fetch_add(1, Ordering::SeqCst) + 1;
    let text = query.get("tex").cloned().unwrap_or_default();
    let token_ok = query.get("tok").map(String::as_str) == Some(MockBaidu::TOKEN);
    *state.last_query.lock().unwrap() = query;

    tokio::time::sleep(state.delay).await;

    if state.behavior == Behavior::SynthesisError || !token_ok {
        return (
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"err_no":502,"err_msg":"access token invalid or no longer valid","sn":"mock","idx":1}"#,
        )
            .into_response();
    }

    ([(header::CONTENT_TYPE, "audio/mp3")], MockBaidu::audio_for(n, &text)).into_response()
}
