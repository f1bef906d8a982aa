//! Learning progress persisted as a single JSON document
//!
//! The document maps each character to its latest review. Updates rewrite
//! the whole file through a temporary file and a rename, serialized by a
//! lock, so readers never see a half-written document.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{ProgressError, Result};

/// Latest review of one character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub learned: bool,
    pub last_reviewed: Timestamp,
}

/// All recorded reviews, keyed by character
pub type ProgressMap = IndexMap<String, Review>;

#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every recorded review
    ///
    /// A store that has never been written is empty.
    pub async fn load(&self) -> Result<ProgressMap> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ProgressMap::new()),
            Err(e) => return Err(storage(&self.path, &e)),
        };

        serde_json::from_slice(&raw).map_err(|e| storage(&self.path, &e))
    }

    /// Insert or replace the review for `character`, stamped with the current time
    pub async fn record(&self, character: &str, learned: bool) -> Result<Review> {
        let _guard = self.write_lock.lock().await;

        let mut progress = self.load().await?;
        let review = Review {
            learned,
            last_reviewed: Timestamp::now(),
        };
        progress.insert(character.to_string(), review.clone());

        self.persist(&progress).await?;

        Ok(review)
    }

    async fn persist(&self, progress: &ProgressMap) -> Result<()> {
        let json = serde_json::to_vec_pretty(progress).map_err(|e| storage(&self.path, &e))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage(parent, &e))?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&temp_path, &json).await {
            tokio::fs::remove_file(&temp_path).await.ok();
            return Err(storage(&temp_path, &e));
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            tokio::fs::remove_file(&temp_path).await.ok();
            return Err(storage(&self.path, &e));
        }

        Ok(())
    }
}

fn storage(path: &Path, err: &dyn std::fmt::Display) -> ProgressError {
    ProgressError::Storage(format!("{}: {err}", path.display()))
}
