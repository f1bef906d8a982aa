use std::{path::PathBuf, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

/// Speaker ids accepted by the Baidu short-text synthesis API
pub const BAIDU_PERSONS: &[u8] = &[0, 1, 3, 4, 5, 103, 106, 110, 111];

/// Premium speaker ids that do not fit in a `u8`
pub const BAIDU_PREMIUM_PERSONS: &[u16] = &[5003, 5118];

/// Top-level TTS configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    /// Directory holding synthesized audio, one file per content hash
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Upper bound for each outbound call to the speech provider
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Coalesce concurrent cache misses for identical text into one upstream call
    #[serde(default = "default_true")]
    pub single_flight: bool,
    /// Baidu speech provider
    #[serde(default)]
    pub baidu: Option<BaiduConfig>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            request_timeout_seconds: default_request_timeout_seconds(),
            single_flight: true,
            baidu: None,
        }
    }
}

impl TtsConfig {
    /// Outbound request timeout as a `Duration`
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Validate cache and provider settings
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory is empty, the timeout is zero,
    /// or the provider configuration is invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            anyhow::bail!("tts.cache_dir must not be empty");
        }

        if self.request_timeout_seconds == 0 {
            anyhow::bail!("tts.request_timeout_seconds must be greater than 0");
        }

        if let Some(ref baidu) = self.baidu {
            baidu.validate()?;
        }

        Ok(())
    }
}

/// Baidu credential and synthesis endpoint configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaiduConfig {
    /// API key issued by the Baidu console
    pub client_id: SecretString,
    /// Secret key paired with `client_id`
    pub client_secret: SecretString,
    /// OAuth token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: Url,
    /// Short-text synthesis endpoint
    #[serde(default = "default_synthesis_url")]
    pub synthesis_url: Url,
    /// Client identifier sent with each synthesis call
    #[serde(default = "default_cuid")]
    pub cuid: String,
    /// Reuse access tokens until shortly before they expire
    #[serde(default)]
    pub cache_token: bool,
    /// Voice parameters
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl BaiduConfig {
    /// Validate credentials and voice parameters
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are empty or voice parameters fall
    /// outside the ranges the provider accepts
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.client_id.expose_secret().is_empty() {
            anyhow::bail!("tts.baidu.client_id must not be empty");
        }

        if self.client_secret.expose_secret().is_empty() {
            anyhow::bail!("tts.baidu.client_secret must not be empty");
        }

        if self.cuid.is_empty() {
            anyhow::bail!("tts.baidu.cuid must not be empty");
        }

        self.voice.validate()
    }
}

/// Synthesis parameters sent to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// Speaking rate, 0-15
    #[serde(default = "default_speed")]
    pub speed: u8,
    /// Pitch, 0-15
    #[serde(default = "default_pitch")]
    pub pitch: u8,
    /// Volume, 0-15
    #[serde(default = "default_volume")]
    pub volume: u8,
    /// Speaker persona id
    #[serde(default = "default_person")]
    pub person: u16,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            pitch: default_pitch(),
            volume: default_volume(),
            person: default_person(),
        }
    }
}

impl VoiceConfig {
    /// Largest value accepted for speed, pitch, and volume
    pub const MAX_LEVEL: u8 = 15;

    /// Check every parameter against the provider's accepted values
    ///
    /// # Errors
    ///
    /// Returns an error naming the first parameter that is out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [("speed", self.speed), ("pitch", self.pitch), ("volume", self.volume)] {
            if value > Self::MAX_LEVEL {
                anyhow::bail!("tts.baidu.voice.{name} must be between 0 and {}, got {value}", Self::MAX_LEVEL);
            }
        }

        let known = u8::try_from(self.person).map_or_else(
            |_| BAIDU_PREMIUM_PERSONS.contains(&self.person),
            |person| BAIDU_PERSONS.contains(&person),
        );

        if !known {
            anyhow::bail!("tts.baidu.voice.person {} is not a known speaker id", self.person);
        }

        Ok(())
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("audio_cache")
}

#[allow(clippy::missing_const_for_fn)]
fn default_request_timeout_seconds() -> u64 {
    30
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

fn default_token_url() -> Url {
    Url::parse("https://aip.baidubce.com/oauth/2.0/token").expect("must be valid URL")
}

fn default_synthesis_url() -> Url {
    Url::parse("https://tsn.baidu.com/text2audio").expect("must be valid URL")
}

fn default_cuid() -> String {
    "hanzi_app".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_speed() -> u8 {
    4
}

#[allow(clippy::missing_const_for_fn)]
fn default_pitch() -> u8 {
    5
}

#[allow(clippy::missing_const_for_fn)]
fn default_volume() -> u8 {
    15
}

#[allow(clippy::missing_const_for_fn)]
fn default_person() -> u16 {
    4
}
