#![allow(clippy::must_use_candidate)]

pub mod characters;
pub mod cors;
mod env;
pub mod health;
mod loader;
pub mod progress;
pub mod server;
pub mod telemetry;
pub mod tts;

use serde::Deserialize;

pub use characters::*;
pub use cors::*;
pub use health::*;
pub use progress::*;
pub use server::*;
pub use telemetry::TelemetryConfig;
pub use tts::*;

/// Top-level hanzi configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Text-to-speech configuration
    #[serde(default)]
    pub tts: TtsConfig,
    /// Character list configuration
    #[serde(default)]
    pub characters: CharactersConfig,
    /// Learning progress configuration
    #[serde(default)]
    pub progress: ProgressConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
