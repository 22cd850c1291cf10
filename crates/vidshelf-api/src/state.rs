//! Application state and sub-state extractors.
//!
//! Handlers extract only the part they need through Axum's `FromRef`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use vidshelf_core::constants::MEDIA_ROUTE_PREFIX;
use vidshelf_core::Config;
use vidshelf_storage::MediaStore;

/// Characters escaped when an identifier is placed in a share URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_');

/// Media store and the limits that apply to it.
#[derive(Clone)]
pub struct MediaState {
    pub store: Arc<dyn MediaStore>,
    /// Base of generated share URLs, without trailing slash.
    pub public_base_url: String,
    pub max_upload_bytes: u64,
}

impl MediaState {
    pub fn new(store: Arc<dyn MediaStore>, config: &Config) -> Self {
        Self {
            store,
            public_base_url: config.public_base_url().trim_end_matches('/').to_string(),
            max_upload_bytes: config.max_video_size_bytes(),
        }
    }

    /// Public URL under which a stored video is served.
    pub fn public_url(&self, id: &str) -> String {
        format!(
            "{}{}{}",
            self.public_base_url,
            MEDIA_ROUTE_PREFIX,
            utf8_percent_encode(id, PATH_SEGMENT)
        )
    }
}

pub struct AppState {
    pub media: MediaState,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn MediaStore>) -> Self {
        Self {
            media: MediaState::new(store, &config),
            config,
        }
    }
}

impl axum::extract::FromRef<Arc<AppState>> for MediaState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.media.clone()
    }
}
