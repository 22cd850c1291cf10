//! Share-link copy counters.
//!
//! Counts are kept in memory and persisted as one JSON object in a hidden file at
//! the root of the store. Every change rewrites the file through the staging
//! directory and an atomic rename, the same way uploads are published.

use crate::traits::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

pub(crate) const COPY_COUNTS_FILE: &str = ".copy-counts.json";

pub(crate) struct CopyCounts {
    path: PathBuf,
    staging_dir: PathBuf,
    // Held across the file rewrite so writers never interleave.
    counts: Mutex<BTreeMap<String, u64>>,
}

impl CopyCounts {
    /// Load persisted counts; a missing file means no copies yet.
    pub(crate) async fn load(base_path: &Path, staging_dir: PathBuf) -> StorageResult<Self> {
        let path = base_path.join(COPY_COUNTS_FILE);

        let counts = match fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                StorageError::ConfigError(format!(
                    "Corrupt copy counter file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Io(e)),
        };

        Ok(Self {
            path,
            staging_dir,
            counts: Mutex::new(counts),
        })
    }

    pub(crate) async fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts.lock().await.clone()
    }

    /// Add one copy for `id` and persist, returning the new total.
    pub(crate) async fn increment(&self, id: &str) -> StorageResult<u64> {
        let mut counts = self.counts.lock().await;
        let mut next = counts.clone();
        let total = next.entry(id.to_string()).or_insert(0);
        *total = total.saturating_add(1);
        let total = *total;

        self.persist(&next).await?;
        *counts = next;

        Ok(total)
    }

    /// Forget the counter of a deleted resource.
    pub(crate) async fn remove(&self, id: &str) -> StorageResult<()> {
        let mut counts = self.counts.lock().await;
        if !counts.contains_key(id) {
            return Ok(());
        }

        let mut next = counts.clone();
        next.remove(id);

        self.persist(&next).await?;
        *counts = next;

        Ok(())
    }

    async fn persist(&self, counts: &BTreeMap<String, u64>) -> StorageResult<()> {
        let body = serde_json::to_vec(counts).map_err(|e| {
            StorageError::UploadFailed(format!("Failed to encode copy counters: {}", e))
        })?;

        let staging = self
            .staging_dir
            .join(format!("{}.counts", Uuid::new_v4().simple()));

        let result = async {
            let mut file = fs::File::create(&staging).await?;
            file.write_all(&body).await?;
            file.sync_all().await?;
            fs::rename(&staging, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to persist copy counters {}: {}",
                self.path.display(),
                e
            )));
        }

        Ok(())
    }
}
