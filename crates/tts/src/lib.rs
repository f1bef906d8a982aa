#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod flight;
mod http_client;
pub mod provider;
mod request;
mod server;
mod types;

use std::sync::Arc;

use axum::{Router, extract::State, response::Response, routing::get};

pub use error::{Result, TtsError};
pub use flight::SingleFlight;
pub use request::ExtractSpeech;
pub use server::{Server, TtsServerBuilder};
pub use types::{AccessToken, AudioStream, CACHE_STATUS_HEADER, CacheStatus, SpeechRequest, SpeechResponse, SynthesisParams};

/// Build the TTS server from configuration
pub async fn build_server(config: &hanzi_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = TtsServerBuilder::new(config)
        .build()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize TTS server: {e}"))?;

    Ok(Arc::new(server))
}

/// Create the endpoint router for TTS
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new().route("/api/tts", get(speak))
}

/// Handle `GET /api/tts`
async fn speak(State(server): State<Arc<Server>>, ExtractSpeech(request): ExtractSpeech) -> Result<Response> {
    let response = server.speak(&request).await?;

    tracing::debug!(
        cache_key = %response.cache_key,
        cache_status = response.cache_status.as_str(),
        "sending audio"
    );

    Ok(response.into_response())
}
