#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod store;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::get,
};
use serde::{Deserialize, Serialize};

pub use error::{ProgressError, Result};
pub use store::{ProgressMap, ProgressStore, Review};

/// Body of `POST /api/progress`
#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub learned: bool,
}

/// Acknowledgement of a stored update
#[derive(Debug, Serialize)]
pub struct UpdateAck {
    pub success: bool,
}

/// Build the progress store from configuration
pub fn build_server(config: &hanzi_config::Config) -> Arc<ProgressStore> {
    Arc::new(ProgressStore::new(config.progress.path.clone()))
}

/// Create the endpoint router for learning progress
pub fn endpoint_router() -> Router<Arc<ProgressStore>> {
    Router::new().route("/api/progress", get(list).post(update))
}

/// Every recorded review; an unreadable store reads as empty
async fn list(State(store): State<Arc<ProgressStore>>) -> Json<ProgressMap> {
    match store.load().await {
        Ok(progress) => {
            tracing::info!(count = progress.len(), "loaded progress");
            Json(progress)
        }
        Err(e) => {
            tracing::error!("failed to load progress: {e}");
            Json(ProgressMap::new())
        }
    }
}

async fn update(
    State(store): State<Arc<ProgressStore>>,
    body: std::result::Result<Json<ProgressUpdate>, JsonRejection>,
) -> Result<Json<UpdateAck>> {
    let Json(update) = body.map_err(|e| ProgressError::InvalidBody(e.body_text()))?;

    let character = update
        .character
        .filter(|c| !c.is_empty())
        .ok_or(ProgressError::MissingCharacter)?;

    store.record(&character, update.learned).await.inspect_err(|e| {
        tracing::error!(%character, "failed to save progress: {e}");
    })?;

    tracing::info!(%character, learned = update.learned, "progress updated");

    Ok(Json(UpdateAck { success: true }))
}
