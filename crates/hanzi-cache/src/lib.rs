//! Content-addressed audio cache on the local filesystem
//!
//! Each synthesized clip is stored as `<dir>/<key>.mp3`, where `key` is the
//! SHA-256 hex digest of the UTF-8 text it pronounces. Entries are written
//! to a private temporary file and renamed into place, so a reader never
//! observes a partially written clip. Nothing is ever evicted.

mod writer;

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio_util::io::ReaderStream;

pub use writer::CacheWriter;

/// File extension of cached entries
const ENTRY_EXTENSION: &str = "mp3";

/// Length of a hex-encoded SHA-256 digest
const KEY_LEN: usize = 64;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry exists for the key
    #[error("no cached audio for key {0}")]
    NotFound(String),
    /// The key is not a content hash produced by [`content_key`]
    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),
    /// Filesystem operation failed
    #[error("cache I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Compute the cache key for a piece of text
///
/// Lowercase hex SHA-256 of the UTF-8 bytes: fixed length, filesystem-safe,
/// and stable across restarts.
pub fn content_key(text: &str) -> String {
    let hash = Sha256::digest(text.as_bytes());
    format!("{hash:x}")
}

/// Audio cache rooted at a directory shared by all request handlers
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: Arc<PathBuf>,
}

impl AudioCache {
    /// Open the cache, creating its directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(&dir, e))?;

        tracing::debug!(dir = %dir.display(), "audio cache ready");

        Ok(Self { dir: Arc::new(dir) })
    }

    /// Directory holding the cache entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `key`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] unless `key` is a 64-character
    /// lowercase hex digest
    pub fn entry_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{ENTRY_EXTENSION}")))
    }

    /// Check whether an entry exists for `key`
    ///
    /// A failed existence check is reported as absent; the caller then
    /// regenerates and overwrites the entry.
    pub async fn has(&self, key: &str) -> bool {
        let Ok(path) = self.entry_path(key) else {
            return false;
        };

        match tokio::fs::try_exists(&path).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(cache_key = key, "cache existence check failed: {e}");
                false
            }
        }
    }

    /// Read the full entry for `key`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] if there is no entry, or an I/O error
    pub async fn read(&self, key: &str) -> Result<Bytes, CacheError> {
        let path = self.entry_path(key)?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::NotFound(key.to_string())),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    /// Open the entry for `key` as a stream of chunks
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] if there is no entry, or an I/O error
    pub async fn stream(&self, key: &str) -> Result<ReaderStream<tokio::fs::File>, CacheError> {
        let path = self.entry_path(key)?;

        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(ReaderStream::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::NotFound(key.to_string())),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    /// Store `data` as the entry for `key`, replacing any existing entry
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or renamed
    pub async fn write(&self, key: &str, data: &[u8]) -> Result<(), CacheError> {
        let mut writer = self.writer(key).await?;
        writer.write_chunk(data).await?;
        writer.commit().await?;
        Ok(())
    }

    /// Start a streaming write of the entry for `key`
    ///
    /// Nothing becomes visible under `key` until [`CacheWriter::commit`]
    /// succeeds; dropping the writer discards the partial data.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the temporary file cannot be created
    pub async fn writer(&self, key: &str) -> Result<CacheWriter, CacheError> {
        let final_path = self.entry_path(key)?;
        let temp_path = self.dir.join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4().simple()));

        CacheWriter::create(key.to_string(), temp_path, final_path).await
    }
}

fn validate_key(key: &str) -> Result<(), CacheError> {
    let well_formed =
        key.len() == KEY_LEN && key.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

    if well_formed {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}
