use crate::{LocalStorage, MediaStore, StorageResult};
use std::sync::Arc;
use vidshelf_core::Config;

/// Create the media store described by the configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn MediaStore>> {
    let storage = LocalStorage::new(config.media_storage_path())
        .await?
        .with_chunk_size(config.stream_chunk_size_bytes());

    tracing::info!(
        path = %storage.base_path().display(),
        chunk_size = config.stream_chunk_size_bytes(),
        "Local media store ready"
    );

    Ok(Arc::new(storage))
}
