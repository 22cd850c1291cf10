//! Vidshelf HTTP service.
//!
//! Public byte-range delivery of stored MP4 files under `/v/{id}`, plus a small
//! JSON API for uploading, listing and deleting them.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;
mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, MediaState};
