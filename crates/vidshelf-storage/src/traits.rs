//! Media store abstraction trait
//!
//! This module defines the MediaStore trait the HTTP layer works against.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("File exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked body of a stored resource, or of a window into it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Source of bytes for a new resource.
pub type ByteReader<'a> = Pin<Box<dyn AsyncRead + Send + 'a>>;

/// A published resource as seen by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub id: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    /// Times the share link was copied.
    pub copy_count: u64,
}

/// Media store abstraction
///
/// Resources are immutable once published: `put_stream` makes a resource visible
/// only after all of its bytes are durable, and nothing rewrites it afterwards.
/// Every method rejects identifiers that fail [`crate::is_valid_media_id`] with
/// [`StorageError::InvalidKey`] before touching the backing store.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Size in bytes of a published resource.
    async fn content_length(&self, id: &str) -> StorageResult<u64>;

    /// Stream `len` bytes of a resource starting at byte `start`.
    ///
    /// The returned stream owns its file handle; dropping the stream releases it.
    async fn open_range(&self, id: &str, start: u64, len: u64) -> StorageResult<ByteStream>;

    /// Publish a new resource from `reader`, returning the number of bytes written.
    ///
    /// Fails with [`StorageError::TooLarge`] once more than `max_bytes` have been read,
    /// in which case nothing is published.
    async fn put_stream<'a>(
        &self,
        id: &str,
        reader: ByteReader<'a>,
        max_bytes: u64,
    ) -> StorageResult<u64>;

    /// Remove a published resource. Missing resources are [`StorageError::NotFound`].
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Every published resource, in no particular order.
    async fn list(&self) -> StorageResult<Vec<StoredMedia>>;

    /// Count one copy of a published resource's share link, returning the new total.
    ///
    /// Missing resources are [`StorageError::NotFound`]. Counters are forgotten
    /// when the resource is deleted.
    async fn record_copy(&self, id: &str) -> StorageResult<u64>;

    /// Check that the store is reachable and writable.
    async fn health_check(&self) -> StorageResult<()>;
}
