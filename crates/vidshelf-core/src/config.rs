//! Configuration module
//!
//! Server configuration is read from the environment (optionally seeded from a `.env`
//! file) once at startup and validated before anything binds a socket.

use std::env;
use std::path::PathBuf;

use crate::constants::MAX_FILES_PER_UPLOAD;

// Common constants
const SERVER_PORT: u16 = 3000;
const MAX_VIDEO_SIZE_MB: u64 = 500;
const STREAM_CHUNK_SIZE_KB: usize = 64;
const MAX_STREAM_CHUNK_SIZE_KB: usize = 4096;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
const MEDIA_STORAGE_PATH: &str = "./uploads";

/// Settings for the media server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    /// Flat directory holding every published video.
    pub media_storage_path: PathBuf,
    /// Base of the share links handed out after upload, without trailing slash.
    pub public_base_url: String,
    pub max_video_size_bytes: u64,
    pub stream_chunk_size_bytes: usize,
    pub http_concurrency_limit: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServerConfig>);

impl Config {
    fn as_server(&self) -> &ServerConfig {
        &self.0
    }

    pub fn new(config: ServerConfig) -> Self {
        Config(Box::new(config))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.as_server().environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServerConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_server().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_server().server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_server().environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_server().cors_origins
    }

    pub fn media_storage_path(&self) -> &std::path::Path {
        &self.as_server().media_storage_path
    }

    pub fn public_base_url(&self) -> &str {
        &self.as_server().public_base_url
    }

    pub fn max_video_size_bytes(&self) -> u64 {
        self.as_server().max_video_size_bytes
    }

    pub fn stream_chunk_size_bytes(&self) -> usize {
        self.as_server().stream_chunk_size_bytes
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.as_server().http_concurrency_limit
    }
}

fn megabytes_to_bytes(mb: u64) -> Option<u64> {
    mb.checked_mul(1024)?.checked_mul(1024)
}

fn is_production_environment(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", server_port))
            .trim()
            .trim_end_matches('/')
            .to_string();

        let max_video_size_mb = env::var("MAX_VIDEO_SIZE_MB")
            .unwrap_or_else(|_| MAX_VIDEO_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_VIDEO_SIZE_MB);

        let stream_chunk_size_kb = env::var("STREAM_CHUNK_SIZE_KB")
            .unwrap_or_else(|_| STREAM_CHUNK_SIZE_KB.to_string())
            .parse::<usize>()
            .unwrap_or(STREAM_CHUNK_SIZE_KB);

        let config = ServerConfig {
            server_port,
            environment,
            cors_origins,
            media_storage_path: env::var("MEDIA_STORAGE_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| MEDIA_STORAGE_PATH.to_string())
                .into(),
            public_base_url,
            max_video_size_bytes: megabytes_to_bytes(max_video_size_mb)
                .ok_or_else(|| anyhow::anyhow!("MAX_VIDEO_SIZE_MB is too large"))?,
            stream_chunk_size_bytes: stream_chunk_size_kb
                .checked_mul(1024)
                .ok_or_else(|| anyhow::anyhow!("STREAM_CHUNK_SIZE_KB is too large"))?,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if is_production_environment(&self.environment)
            && self.cors_origins.iter().any(|origin| origin == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "PUBLIC_BASE_URL must start with http:// or https://"
            ));
        }

        if self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be greater than zero"));
        }

        // The upload request body is capped at MAX_FILES_PER_UPLOAD videos.
        let fits_request_limit = self
            .max_video_size_bytes
            .checked_mul(MAX_FILES_PER_UPLOAD as u64)
            .is_some_and(|total| usize::try_from(total).is_ok());
        if !fits_request_limit {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB is too large"));
        }

        if self.stream_chunk_size_bytes == 0
            || self.stream_chunk_size_bytes > MAX_STREAM_CHUNK_SIZE_KB * 1024
        {
            return Err(anyhow::anyhow!(
                "STREAM_CHUNK_SIZE_KB must be between 1 and {}",
                MAX_STREAM_CHUNK_SIZE_KB
            ));
        }

        Ok(())
    }
}
