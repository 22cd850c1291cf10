#![allow(dead_code)]

use axum_test::TestServer;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use vidshelf_api::setup::routes::setup_routes;
use vidshelf_api::AppState;
use vidshelf_core::{Config, ServerConfig};
use vidshelf_storage::{LocalStorage, MediaStore};

/// Identifier of the fixture written by `seed_fixture`.
pub const FIXTURE_ID: &str = "abc";
pub const FIXTURE_LEN: usize = 1000;

pub const PUBLIC_BASE_URL: &str = "http://media.test";

/// Test application backed by a temporary media directory
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub store_dir: TempDir,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn media_path(&self, id: &str) -> PathBuf {
        self.store_dir.path().join(id)
    }

    /// Write a file straight into the store, bypassing the upload endpoint.
    pub fn write_media(&self, id: &str, contents: &[u8]) {
        std::fs::write(self.media_path(id), contents).expect("Failed to write media fixture");
    }

    /// Names of published files, ignoring staging.
    pub fn stored_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = std::fs::read_dir(self.store_dir.path())
            .expect("Failed to read store dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        ids.sort();
        ids
    }
}

/// 1000 bytes where byte `i` is `i % 256`.
pub fn fixture_bytes() -> Vec<u8> {
    (0..FIXTURE_LEN).map(|i| (i % 256) as u8).collect()
}

pub fn test_config(store_path: PathBuf, max_video_size_bytes: u64) -> Config {
    Config::new(ServerConfig {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        media_storage_path: store_path,
        public_base_url: PUBLIC_BASE_URL.to_string(),
        max_video_size_bytes,
        stream_chunk_size_bytes: 64,
        http_concurrency_limit: 64,
    })
}

/// Setup a test application with an empty store
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_limit(10 * 1024 * 1024).await
}

pub async fn setup_test_app_with_limit(max_video_size_bytes: u64) -> TestApp {
    let store_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(store_dir.path().to_path_buf(), max_video_size_bytes);

    let storage = LocalStorage::new(store_dir.path())
        .await
        .expect("Failed to create local storage")
        .with_chunk_size(config.stream_chunk_size_bytes());

    build_app(store_dir, config, Arc::new(storage))
}

/// Test application over a custom store; the temp directory is only a config placeholder.
pub fn setup_test_app_with_store(store: Arc<dyn MediaStore>) -> TestApp {
    let store_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(store_dir.path().to_path_buf(), 10 * 1024 * 1024);
    build_app(store_dir, config, store)
}

fn build_app(store_dir: TempDir, config: Config, store: Arc<dyn MediaStore>) -> TestApp {
    let state = Arc::new(AppState::new(config.clone(), store));
    let app = setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(app).expect("Failed to start test server");

    TestApp {
        server,
        state,
        store_dir,
    }
}

/// Test application with the 1000-byte fixture stored as `abc`.
pub async fn setup_with_fixture() -> TestApp {
    let app = setup_test_app().await;
    app.write_media(FIXTURE_ID, &fixture_bytes());
    app
}
