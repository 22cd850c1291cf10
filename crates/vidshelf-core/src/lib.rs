//! Vidshelf Core Library
//!
//! This crate provides the configuration, error taxonomy, media constants and the
//! byte-range resolver shared by the storage and API crates. Nothing in here
//! performs I/O apart from reading the environment at startup.

pub mod config;
pub mod constants;
pub mod error;
pub mod range;

// Re-export commonly used types
pub use config::{Config, ServerConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use range::{resolve, ByteRangeRequest, ServingPlan};
