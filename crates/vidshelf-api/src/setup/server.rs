//! Server startup and graceful shutdown

use anyhow::{Context, Result};
use axum::Router;
use vidshelf_core::constants::{MAX_FILES_PER_UPLOAD, MEDIA_ROUTE_PREFIX};
use vidshelf_core::Config;

/// Bind the listener and serve until a shutdown signal arrives
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        addr = %local_addr,
        share_url_prefix = %format!("{}{}", config.public_base_url(), MEDIA_ROUTE_PREFIX),
        media_dir = %config.media_storage_path().display(),
        max_upload_mb = config.max_video_size_bytes() / 1024 / 1024,
        max_files_per_upload = MAX_FILES_PER_UPLOAD,
        stream_chunk_kb = config.stream_chunk_size_bytes() / 1024,
        http_concurrency_limit = config.http_concurrency_limit(),
        "vidshelf listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("vidshelf stopped");
    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
///
/// # Panics
/// Panics if a signal handler cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Draining in-flight requests before shutdown");
}
