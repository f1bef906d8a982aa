pub mod baidu_token;
pub mod baidu_tts;

use async_trait::async_trait;

use crate::types::{AccessToken, AudioStream, SynthesisParams};

/// Source of credentials for the speech API
///
/// Failures are reported as [`TtsError::ServiceUnavailable`](crate::TtsError::ServiceUnavailable);
/// the caller treats them as "synthesis unavailable right now", never as fatal.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a token valid for at least one synthesis call
    async fn fetch(&self) -> crate::error::Result<AccessToken>;
}

/// Client for a text-to-speech API
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Start synthesizing `text`, returning the audio as a chunk stream
    ///
    /// A provider response that is not audio fails with
    /// [`TtsError::SynthesisFailed`](crate::TtsError::SynthesisFailed)
    /// before any chunk is yielded.
    async fn synthesize(
        &self,
        text: &str,
        token: &AccessToken,
        params: &SynthesisParams,
    ) -> crate::error::Result<AudioStream>;

    /// Get the provider name
    fn name(&self) -> &str;
}
