use crate::copy_counts::CopyCounts;
use crate::keys::is_valid_media_id;
use crate::traits::{ByteReader, ByteStream, MediaStore, StorageError, StorageResult, StoredMedia};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use uuid::Uuid;

/// Hidden subdirectory of the store where uploads are written before publication.
const STAGING_DIR: &str = ".incoming";

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem storage implementation
///
/// Resources live as regular files directly under `base_path`; copy counters live
/// in a hidden file next to them.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    chunk_size: usize,
    copy_counts: Arc<CopyCounts>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Store directory (e.g., "./uploads"), created if missing
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        let staging_dir = base_path.join(STAGING_DIR);

        fs::create_dir_all(&staging_dir)
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;

        let copy_counts = CopyCounts::load(&base_path, staging_dir).await?;

        Ok(LocalStorage {
            base_path,
            chunk_size: DEFAULT_CHUNK_SIZE,
            copy_counts: Arc::new(copy_counts),
        })
    }

    /// Read size used for each chunk of a streamed response body.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert an identifier to its filesystem path.
    ///
    /// Identifiers are single path components, so validation alone keeps the result
    /// inside the store directory.
    fn id_to_path(&self, id: &str) -> StorageResult<PathBuf> {
        if !is_valid_media_id(id) {
            return Err(StorageError::InvalidKey(
                "Identifier contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(id))
    }

    fn staging_path(&self) -> PathBuf {
        self.base_path
            .join(STAGING_DIR)
            .join(format!("{}.part", Uuid::new_v4().simple()))
    }

    /// Metadata of a published resource; anything that is not a regular file is absent.
    async fn file_metadata(&self, id: &str, path: &Path) -> StorageResult<std::fs::Metadata> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(meta),
            Ok(_) => Err(StorageError::NotFound(id.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[async_trait]
impl MediaStore for LocalStorage {
    async fn content_length(&self, id: &str) -> StorageResult<u64> {
        let path = self.id_to_path(id)?;
        let meta = self.file_metadata(id, &path).await?;
        Ok(meta.len())
    }

    async fn open_range(&self, id: &str, start: u64, len: u64) -> StorageResult<ByteStream> {
        let path = self.id_to_path(id)?;
        let started = std::time::Instant::now();

        let mut file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(id.to_string())
            } else {
                StorageError::DownloadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        if start > 0 {
            file.seek(SeekFrom::Start(start)).await.map_err(|e| {
                StorageError::DownloadFailed(format!(
                    "Failed to seek file {} to {}: {}",
                    path.display(),
                    start,
                    e
                ))
            })?;
        }

        let reader = tokio_util::io::ReaderStream::with_capacity(file.take(len), self.chunk_size);

        let key = id.to_string();
        let stream = reader.map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    key = %key,
                    start = start,
                    len = len,
                    error = %e,
                    duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "Local storage range read error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn put_stream<'a>(
        &self,
        id: &str,
        reader: ByteReader<'a>,
        max_bytes: u64,
    ) -> StorageResult<u64> {
        let path = self.id_to_path(id)?;
        let staging = self.staging_path();
        let started = std::time::Instant::now();

        let written = match write_staged(&staging, reader, max_bytes).await {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&staging).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to publish file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            key = %id,
            size_bytes = written,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(written)
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.id_to_path(id)?;
        let started = std::time::Instant::now();

        self.file_metadata(id, &path).await?;

        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(id.to_string())
            } else {
                StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        // The video is already gone; a stale counter only wastes a few bytes.
        if let Err(e) = self.copy_counts.remove(id).await {
            tracing::warn!(key = %id, error = %e, "Failed to drop copy counter");
        }

        tracing::info!(
            path = %path.display(),
            key = %id,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<StoredMedia>> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let copy_counts = self.copy_counts.snapshot().await;
        let mut media = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(id) = entry.file_name().into_string() else {
                continue;
            };
            if id.starts_with('.') || !is_valid_media_id(&id) {
                continue;
            }

            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                // Deleted between read_dir and stat.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };

            let modified_at = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);

            media.push(StoredMedia {
                copy_count: copy_counts.get(&id).copied().unwrap_or(0),
                id,
                size: meta.len(),
                modified_at,
            });
        }

        Ok(media)
    }

    async fn record_copy(&self, id: &str) -> StorageResult<u64> {
        let path = self.id_to_path(id)?;
        self.file_metadata(id, &path).await?;

        let total = self.copy_counts.increment(id).await?;
        tracing::debug!(key = %id, copy_count = total, "Copy recorded");

        Ok(total)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let staging = self.base_path.join(STAGING_DIR);
        let meta = fs::metadata(&staging).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Staging directory {} unavailable: {}",
                staging.display(),
                e
            ))
        })?;

        if !meta.is_dir() || meta.permissions().readonly() {
            return Err(StorageError::ConfigError(format!(
                "Staging directory {} is not writable",
                staging.display()
            )));
        }

        Ok(())
    }
}

/// Copy at most `max_bytes` from `reader` into a fresh staging file and fsync it.
async fn write_staged(staging: &Path, reader: ByteReader<'_>, max_bytes: u64) -> StorageResult<u64> {
    let mut file = fs::File::create(staging).await.map_err(|e| {
        StorageError::UploadFailed(format!(
            "Failed to create file {}: {}",
            staging.display(),
            e
        ))
    })?;

    // One byte past the limit is enough to tell an oversized upload apart.
    let mut limited = reader.take(max_bytes.saturating_add(1));
    let written = tokio::io::copy(&mut limited, &mut file).await.map_err(|e| {
        StorageError::UploadFailed(format!(
            "Failed to write stream to file {}: {}",
            staging.display(),
            e
        ))
    })?;

    if written > max_bytes {
        return Err(StorageError::TooLarge { limit: max_bytes });
    }

    file.sync_all().await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to sync file {}: {}", staging.display(), e))
    })?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tempfile::tempdir;

    fn reader(data: &[u8]) -> ByteReader<'_> {
        Box::pin(data)
    }

    async fn collect(stream: ByteStream) -> Vec<u8> {
        let chunks: Vec<bytes::Bytes> = stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_put_then_read_full_and_ranges() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap().with_chunk_size(7);
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();

        let written = storage.put_stream("abc", reader(&data), 10_000).await.unwrap();
        assert_eq!(written, 1000);
        assert_eq!(storage.content_length("abc").await.unwrap(), 1000);

        let full = collect(storage.open_range("abc", 0, 1000).await.unwrap()).await;
        assert_eq!(full, data);

        let window = collect(storage.open_range("abc", 200, 100).await.unwrap()).await;
        assert_eq!(window, &data[200..300]);

        let tail = collect(storage.open_range("abc", 900, 100).await.unwrap()).await;
        assert_eq!(tail, &data[900..]);
    }

    #[tokio::test]
    async fn test_zero_length_range_is_empty() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        storage.put_stream("empty", reader(b""), 10).await.unwrap();

        assert_eq!(storage.content_length("empty").await.unwrap(), 0);
        assert!(collect(storage.open_range("empty", 0, 0).await.unwrap())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.content_length("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("a/b").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.open_range("a\\b", 0, 1).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.put_stream("", reader(b"x"), 10).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_missing_and_non_file_entries_are_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        std::fs::create_dir(dir.path().join("folder")).unwrap();

        assert!(matches!(
            storage.content_length("missing").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.content_length("folder").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.open_range("missing", 0, 1).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.delete("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_not_published() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.put_stream("big.mp4", reader(&[0u8; 11]), 10).await;
        assert!(matches!(result, Err(StorageError::TooLarge { limit: 10 })));
        assert!(!dir.path().join("big.mp4").exists());

        let staged = std::fs::read_dir(dir.path().join(STAGING_DIR)).unwrap().count();
        assert_eq!(staged, 0);

        // Exactly at the limit is fine.
        assert_eq!(
            storage.put_stream("big.mp4", reader(&[0u8; 10]), 10).await.unwrap(),
            10
        );
    }

    #[tokio::test]
    async fn test_list_skips_hidden_and_directories() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        storage.put_stream("one.mp4", reader(b"1"), 10).await.unwrap();
        storage.put_stream("two.mp4", reader(b"22"), 10).await.unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let mut listed = storage.list().await.unwrap();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        let ids: Vec<_> = listed.iter().map(|m| (m.id.as_str(), m.size)).collect();
        assert_eq!(ids, vec![("one.mp4", 1), ("two.mp4", 2)]);
    }

    #[tokio::test]
    async fn test_delete_removes_resource() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        storage.put_stream("gone.mp4", reader(b"bye"), 10).await.unwrap();

        storage.delete("gone.mp4").await.unwrap();
        assert!(matches!(
            storage.content_length("gone.mp4").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_record_copy_counts_survive_restart() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        storage.put_stream("clip.mp4", reader(b"data"), 10).await.unwrap();

        assert_eq!(storage.record_copy("clip.mp4").await.unwrap(), 1);
        assert_eq!(storage.record_copy("clip.mp4").await.unwrap(), 2);

        let restarted = LocalStorage::new(dir.path()).await.unwrap();
        let listed = restarted.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "clip.mp4");
        assert_eq!(listed[0].copy_count, 2);
    }

    #[tokio::test]
    async fn test_record_copy_requires_existing_resource() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(matches!(
            storage.record_copy("missing").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.record_copy("../x").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_resets_copy_count() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        storage.put_stream("clip.mp4", reader(b"data"), 10).await.unwrap();
        storage.record_copy("clip.mp4").await.unwrap();

        storage.delete("clip.mp4").await.unwrap();
        storage.put_stream("clip.mp4", reader(b"data"), 10).await.unwrap();

        assert_eq!(storage.list().await.unwrap()[0].copy_count, 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        assert!(storage.health_check().await.is_ok());

        std::fs::remove_dir(dir.path().join(STAGING_DIR)).unwrap();
        assert!(storage.health_check().await.is_err());
    }
}
