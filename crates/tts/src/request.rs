use axum::extract::{FromRequestParts, Query};
use serde::Deserialize;

use crate::{error::TtsError, types::SpeechRequest};

/// Raw query string of `GET /api/tts`
#[derive(Debug, Default, Deserialize)]
struct SpeechQuery {
    #[serde(default)]
    text: String,
    #[serde(default)]
    skip_cache: Option<String>,
}

impl From<SpeechQuery> for SpeechRequest {
    fn from(query: SpeechQuery) -> Self {
        Self {
            text: query.text,
            // Only the literal "true" bypasses the cache
            skip_cache: query.skip_cache.as_deref() == Some("true"),
        }
    }
}

/// Extractor for speech requests carried in the query string
///
/// Missing `text` yields an empty request; emptiness is rejected by the
/// server so the same rule applies to every caller.
pub struct ExtractSpeech(pub SpeechRequest);

impl<S> FromRequestParts<S> for ExtractSpeech
where
    S: Send + Sync,
{
    type Rejection = TtsError;

    async fn from_request_parts(parts: &mut http::request::Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<SpeechQuery>::try_from_uri(&parts.uri)
            .map_err(|e| TtsError::InvalidInput(format!("Failed to parse query string: {e}")))?;

        Ok(Self(query.into()))
    }
}
