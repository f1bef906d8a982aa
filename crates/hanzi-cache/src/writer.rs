use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::CacheError;

/// Streaming writer for a single cache entry
///
/// Chunks go to a uniquely named temporary file in the cache directory.
/// [`commit`](Self::commit) renames it over the final entry path; a writer
/// dropped without committing deletes the temporary file.
#[derive(Debug)]
pub struct CacheWriter {
    key: String,
    temp_path: PathBuf,
    final_path: PathBuf,
    file: Option<tokio::fs::File>,
    bytes_written: u64,
}

impl CacheWriter {
    pub(crate) async fn create(key: String, temp_path: PathBuf, final_path: PathBuf) -> Result<Self, CacheError> {
        let file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| CacheError::io(&temp_path, e))?;

        Ok(Self {
            key,
            temp_path,
            final_path,
            file: Some(file),
            bytes_written: 0,
        })
    }

    /// Key this writer will commit to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bytes written so far
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append a chunk of audio
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), CacheError> {
        let Some(file) = self.file.as_mut() else {
            return Err(CacheError::io(
                &self.temp_path,
                std::io::Error::other("writer already finished"),
            ));
        };

        file.write_all(chunk)
            .await
            .map_err(|e| CacheError::io(&self.temp_path, e))?;

        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Flush the data to disk and publish it under the entry key
    ///
    /// Returns the number of bytes in the committed entry.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or renaming fails; the partial file is
    /// removed in that case
    pub async fn commit(mut self) -> Result<u64, CacheError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|e| CacheError::io(&self.temp_path, e))?;
            file.sync_all().await.map_err(|e| CacheError::io(&self.temp_path, e))?;
        }

        tokio::fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(|e| CacheError::io(&self.final_path, e))?;

        tracing::debug!(cache_key = %self.key, bytes = self.bytes_written, "cache entry committed");

        // Renamed away: nothing left for Drop to clean up
        self.temp_path = PathBuf::new();
        Ok(self.bytes_written)
    }
}

impl Drop for CacheWriter {
    fn drop(&mut self) {
        if self.temp_path.as_os_str().is_empty() {
            return;
        }

        self.file.take();

        if let Err(e) = std::fs::remove_file(&self.temp_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(cache_key = %self.key, "failed to remove partial cache file: {e}");
        }
    }
}
