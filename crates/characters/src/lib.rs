#![allow(clippy::must_use_candidate)]

mod catalog;

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};

pub use catalog::{Catalog, Character, CharacterList};

/// Build the character catalog from configuration
pub fn build_server(config: &hanzi_config::Config) -> Arc<Catalog> {
    Arc::new(Catalog::new(config.characters.path.clone()))
}

/// Create the endpoint router for the character list
pub fn endpoint_router() -> Router<Arc<Catalog>> {
    Router::new().route("/api/characters", get(list))
}

async fn list(State(catalog): State<Arc<Catalog>>) -> Json<CharacterList> {
    Json(catalog.load().await)
}
