//! Route configuration and setup.
//!
//! Two route groups share one router: the public media surface under `/v/`, which
//! answers CORS itself and keeps its immutable cache directive, and the JSON
//! management API, which gets the configured CORS policy and security headers.

pub mod health;

use crate::error::HttpAppError;
use crate::handlers::{events, media_stream, upload, videos};
use crate::middleware::{
    request_id_middleware, security_headers_middleware, SecurityHeadersConfig,
};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use vidshelf_core::constants::{MAX_FILES_PER_UPLOAD, MEDIA_ROUTE_PREFIX};
use vidshelf_core::{AppError, Config};

pub use health::HealthCheckResponse;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let security_headers_config = Arc::new(SecurityHeadersConfig::new(config.is_production()));

    let http_concurrency_limit = config.http_concurrency_limit();
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    // Per-file limits are enforced while streaming to the store; this caps the request.
    let upload_body_limit = usize::try_from(
        config
            .max_video_size_bytes()
            .saturating_mul(MAX_FILES_PER_UPLOAD as u64),
    )
    .unwrap_or(usize::MAX);

    let api = api_routes(state.clone())
        .layer(RequestBodyLimitLayer::new(upload_body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ));

    let app = media_routes()
        .merge(api)
        .fallback(route_not_found)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// `/v/{id}`: exactly one path segment under the media prefix.
///
/// The bare prefix is routed to the same handlers so an empty identifier is
/// answered as an invalid one, with the media CORS headers.
pub fn media_routes() -> Router<Arc<AppState>> {
    let path = format!("{}{{id}}", MEDIA_ROUTE_PREFIX);
    let media = get(media_stream::serve_media)
        .head(media_stream::serve_media)
        .options(media_stream::preflight)
        .fallback(media_stream::method_not_allowed);

    Router::new()
        .route(&path, media.clone())
        .route(MEDIA_ROUTE_PREFIX, media)
}

fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/upload", post(upload::upload_videos))
        .route(
            "/api/videos",
            get(videos::list_videos).delete(videos::delete_video_by_query),
        )
        .route("/api/videos/{id}", delete(videos::delete_video))
        .route("/api/events", post(events::record_event))
        .route(
            "/health",
            get(move || {
                let state = state.clone();
                async { health::health_check(state).await }
            }),
        )
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::ApiDoc::openapi()) }),
        )
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

async fn route_not_found() -> HttpAppError {
    HttpAppError(AppError::NotFound("Route not found".to_string()))
}
