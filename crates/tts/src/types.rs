use std::{fmt, time::Duration};

use axum::{
    body::Body,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::stream::BoxStream;
use hanzi_config::VoiceConfig;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::io::ReaderStream;

/// Header reporting how the audio was obtained
pub const CACHE_STATUS_HEADER: &str = "x-hanzi-cache";

/// A request to pronounce a piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Text to synthesize
    pub text: String,
    /// Regenerate the audio even if a cached copy exists
    pub skip_cache: bool,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            skip_cache: false,
        }
    }

    #[must_use]
    pub const fn skipping_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }
}

/// Short-lived credential for the speech API
#[derive(Clone)]
pub struct AccessToken {
    value: SecretString,
    expires_in: Option<Duration>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            value: SecretString::from(value.into()),
            expires_in,
        }
    }

    /// Token value to send to the provider
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Lifetime declared by the provider when the token was issued
    pub const fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Voice parameters for a synthesis call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisParams {
    /// Speaking rate, 0-15
    pub speed: u8,
    /// Pitch, 0-15
    pub pitch: u8,
    /// Volume, 0-15
    pub volume: u8,
    /// Speaker persona id
    pub person: u16,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        VoiceConfig::default().into()
    }
}

impl From<VoiceConfig> for SynthesisParams {
    fn from(voice: VoiceConfig) -> Self {
        Self {
            speed: voice.speed,
            pitch: voice.pitch,
            volume: voice.volume,
            person: voice.person,
        }
    }
}

/// Audio streamed from the provider, chunk by chunk
pub type AudioStream = BoxStream<'static, crate::Result<Bytes>>;

/// How the served audio was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from an existing cache entry
    Hit,
    /// Synthesized because no entry existed
    Miss,
    /// Synthesized because the caller asked to skip the cache
    Bypass,
}

impl CacheStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
        }
    }
}

/// Audio ready to be sent to the client, read from the cache
pub struct SpeechResponse {
    /// Content hash of the requested text
    pub cache_key: String,
    /// Whether the audio came from the cache
    pub cache_status: CacheStatus,
    body: ReaderStream<tokio::fs::File>,
}

impl SpeechResponse {
    pub(crate) const fn new(cache_key: String, cache_status: CacheStatus, body: ReaderStream<tokio::fs::File>) -> Self {
        Self {
            cache_key,
            cache_status,
            body,
        }
    }

    /// Convert the speech response into an axum HTTP response
    ///
    /// Always carries the no-cache directives so browsers re-fetch and the
    /// server-side cache stays authoritative.
    pub fn into_response(self) -> Response {
        let mut headers = hanzi_core::headers::audio_response();
        headers.insert(
            CACHE_STATUS_HEADER,
            http::HeaderValue::from_static(self.cache_status.as_str()),
        );

        (headers, Body::from_stream(self.body)).into_response()
    }
}

impl fmt::Debug for SpeechResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechResponse")
            .field("cache_key", &self.cache_key)
            .field("cache_status", &self.cache_status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("24.abcdef", Some(Duration::from_secs(60)));
        let debug = format!("{token:?}");
        assert!(!debug.contains("abcdef"));
        assert_eq!(token.expose(), "24.abcdef");
    }

    #[test]
    fn params_follow_voice_config() {
        let params = SynthesisParams::from(VoiceConfig {
            speed: 7,
            pitch: 2,
            volume: 9,
            person: 103,
        });
        assert_eq!(params.speed, 7);
        assert_eq!(params.pitch, 2);
        assert_eq!(params.volume, 9);
        assert_eq!(params.person, 103);
    }

    #[test]
    fn request_builder_sets_skip_cache() {
        let request = SpeechRequest::new("你好").skipping_cache();
        assert!(request.skip_cache);
        assert!(!SpeechRequest::new("你好").skip_cache);
    }
}
