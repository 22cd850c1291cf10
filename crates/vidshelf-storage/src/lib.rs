//! Vidshelf Storage Library
//!
//! This crate provides the media store abstraction and its local filesystem
//! implementation.
//!
//! # Identifier format
//!
//! The store is a single flat directory. Every published video is one regular file
//! whose name is its public identifier: `{32 hex token}-{sanitized original name}`.
//! Identifiers never contain `/`, `\` or `..`; see the `keys` module. Uploads are
//! staged in a hidden subdirectory and renamed into place once complete, so readers
//! never observe a partially written file. Share-link copy counters are kept in a
//! hidden JSON file in the same directory.

mod copy_counts;
pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{generate_media_id, is_valid_media_id, original_name_from_id, sanitize_filename};
pub use local::LocalStorage;
pub use traits::{ByteReader, ByteStream, MediaStore, StorageError, StorageResult, StoredMedia};
