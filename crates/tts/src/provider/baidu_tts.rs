use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use url::Url;

use crate::{
    error::TtsError,
    types::{AccessToken, AudioStream, SynthesisParams},
};

use super::SpeechSynthesizer;

/// Client type for web API callers
const CLIENT_TYPE: &str = "1";

/// Synthesis language
const LANGUAGE: &str = "zh";

/// Output encoding: MP3
const AUDIO_ENCODING: &str = "3";

/// Media types the provider uses for MP3 audio; anything else is an error body
const AUDIO_MEDIA_TYPES: &[&str] = &["audio/mp3", "audio/mpeg"];

/// Baidu short-text synthesis client
pub struct BaiduSynthesizer {
    client: Client,
    synthesis_url: Url,
    cuid: String,
    name: String,
}

impl BaiduSynthesizer {
    pub fn new(name: String, client: Client, synthesis_url: Url, cuid: String) -> Self {
        Self {
            client,
            synthesis_url,
            cuid,
            name,
        }
    }
}

/// Whether a `Content-Type` value denotes MP3 audio
fn is_audio(content_type: &str) -> bool {
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    AUDIO_MEDIA_TYPES
        .iter()
        .any(|expected| media_type.eq_ignore_ascii_case(expected))
}

#[async_trait]
impl SpeechSynthesizer for BaiduSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        token: &AccessToken,
        params: &SynthesisParams,
    ) -> crate::error::Result<AudioStream> {
        tracing::debug!(
            "Baidu TTS request: person={}, speed={}, pitch={}, volume={}, input_len={}",
            params.person,
            params.speed,
            params.pitch,
            params.volume,
            text.chars().count(),
        );

        let speed = params.speed.to_string();
        let pitch = params.pitch.to_string();
        let volume = params.volume.to_string();
        let person = params.person.to_string();

        let response = self
            .client
            .get(self.synthesis_url.clone())
            .query(&[
                ("tex", text),
                ("tok", token.expose()),
                ("cuid", self.cuid.as_str()),
                ("ctp", CLIENT_TYPE),
                ("lan", LANGUAGE),
                ("spd", speed.as_str()),
                ("pit", pitch.as_str()),
                ("vol", volume.as_str()),
                ("per", person.as_str()),
                ("aue", AUDIO_ENCODING),
            ])
            .send()
            .await
            .map_err(|e| {
                // The request URL carries the access token
                let e = e.without_url();
                tracing::error!("Baidu TTS request failed: {e}");
                TtsError::SynthesisFailed(format!("Failed to send request to Baidu TTS: {e}"))
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() || !is_audio(&content_type) {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!("Baidu TTS API error ({status}, content-type {content_type:?}): {error_text}");

            return Err(TtsError::SynthesisFailed(error_text));
        }

        let audio = response.bytes_stream().map_err(|e| {
            let e = e.without_url();
            tracing::error!("Baidu TTS audio stream interrupted: {e}");
            TtsError::SynthesisFailed(format!("Audio stream interrupted: {e}"))
        });

        Ok(audio.boxed())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
