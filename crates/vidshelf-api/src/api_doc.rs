//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::setup::routes;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vidshelf API",
        version = "0.1.0",
        description = "Self-hosted MP4 upload and delivery. Videos are uploaded through the JSON API and served publicly from /v/{id} with HTTP byte-range support."
    ),
    paths(
        handlers::media_stream::serve_media,
        handlers::upload::upload_videos,
        handlers::videos::list_videos,
        handlers::videos::delete_video,
        handlers::videos::delete_video_by_query,
        handlers::events::record_event,
        routes::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::upload::UploadResponse,
        handlers::upload::UploadedVideo,
        handlers::videos::VideoListResponse,
        handlers::videos::VideoEntry,
        handlers::videos::Pagination,
        handlers::videos::DeleteResponse,
        handlers::events::VideoEventRequest,
        handlers::events::VideoEventResponse,
        routes::HealthCheckResponse,
    )),
    tags(
        (name = "media", description = "Public video delivery"),
        (name = "videos", description = "Upload, listing and deletion"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
