use std::path::PathBuf;

use serde::Deserialize;

/// Character list configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharactersConfig {
    /// JSON file holding the character list
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl Default for CharactersConfig {
    fn default() -> Self {
        Self { path: default_path() }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("characters.json")
}
