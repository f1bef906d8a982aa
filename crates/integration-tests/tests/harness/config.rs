//! Programmatic configuration builder for integration tests

use std::{net::SocketAddr, path::Path};

use hanzi_config::{BaiduConfig, Config, CorsConfig, VoiceConfig};
use secrecy::SecretString;

use super::mock_baidu::MockBaidu;

/// Builder for constructing test configurations
///
/// Every file the server touches lives under the given directory.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(dir: &Path) -> Self {
        let mut config = Config::default();
        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.tts.cache_dir = dir.join("audio_cache");
        config.tts.request_timeout_seconds = 5;
        config.characters.path = dir.join("characters.json");
        config.progress.path = dir.join("data").join("progress.json");

        Self { config }
    }

    /// Point the speech provider at a mock backend
    pub fn with_baidu(mut self, mock: &MockBaidu) -> Self {
        self.config.tts.baidu = Some(BaiduConfig {
            client_id: SecretString::from(MockBaidu::CLIENT_ID),
            client_secret: SecretString::from(MockBaidu::CLIENT_SECRET),
            token_url: mock.token_url(),
            synthesis_url: mock.synthesis_url(),
            cuid: "hanzi_test".to_string(),
            cache_token: false,
            voice: VoiceConfig::default(),
        });
        self
    }

    pub fn with_voice(mut self, voice: VoiceConfig) -> Self {
        if let Some(ref mut baidu) = self.config.tts.baidu {
            baidu.voice = voice;
        }
        self
    }

    pub fn with_token_cache(mut self) -> Self {
        if let Some(ref mut baidu) = self.config.tts.baidu {
            baidu.cache_token = true;
        }
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.config.tts.request_timeout_seconds = seconds;
        self
    }

    pub fn without_single_flight(mut self) -> Self {
        self.config.tts.single_flight = false;
        self
    }

    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    pub fn with_static_dir(mut self, dir: &Path) -> Self {
        self.config.server.static_dir = Some(dir.to_path_buf());
        self
    }

    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
