use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A character card shown to the learner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub character: String,
    pub pinyin: String,
    /// Extra card fields, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Character {
    pub fn new(character: impl Into<String>, pinyin: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            pinyin: pinyin.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Body of `GET /api/characters`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterList {
    pub characters: Vec<Character>,
}

impl CharacterList {
    /// Served when the character file cannot be loaded
    pub fn fallback() -> Self {
        Self {
            characters: vec![
                Character::new("一", "yī"),
                Character::new("二", "èr"),
                Character::new("三", "sān"),
            ],
        }
    }
}

/// Character list backed by a JSON file
///
/// The file is re-read on every load so edits show up without a restart.
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the list, falling back to the built-in one on any failure
    pub async fn load(&self) -> CharacterList {
        match self.read().await {
            Ok(list) => {
                tracing::debug!(path = %self.path.display(), count = list.characters.len(), "loaded characters");
                list
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), "failed to load characters: {e:#}");
                CharacterList::fallback()
            }
        }
    }

    async fn read(&self) -> anyhow::Result<CharacterList> {
        let raw = tokio::fs::read(&self.path).await.context("failed to read file")?;
        serde_json::from_slice(&raw).context("failed to parse character list")
    }
}
