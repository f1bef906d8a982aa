use std::path::PathBuf;

use serde::Deserialize;

/// Learning progress store configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgressConfig {
    /// JSON file the progress records persist to
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { path: default_path() }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("data/progress.json")
}
