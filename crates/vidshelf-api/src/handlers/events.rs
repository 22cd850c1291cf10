//! Usage events reported by the video list.
//!
//! Only share-link copies are recorded; each one bumps the video's copy counter.

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::media_stream::decode_media_id;
use crate::state::MediaState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vidshelf_core::constants::{COPY_EVENT_TYPE, MEDIA_ROUTE_PREFIX};
use vidshelf_core::AppError;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoEventRequest {
    /// Event type; only `copied` is recorded
    #[serde(rename = "type")]
    pub event_type: String,
    /// Share URL of the video, as returned by the upload or listing
    pub video_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoEventResponse {
    pub id: String,
    pub copy_count: u64,
}

/// Identifier of the video a share URL points at.
///
/// Accepts absolute URLs and bare paths; query strings and fragments are ignored.
pub fn media_id_from_url(url: &str) -> Result<String, AppError> {
    let path = url.split(['?', '#']).next().unwrap_or_default();

    let raw = path
        .rfind(MEDIA_ROUTE_PREFIX)
        .map(|at| &path[at + MEDIA_ROUTE_PREFIX.len()..])
        .ok_or_else(|| AppError::InvalidInput("videoUrl is not a video share URL".to_string()))?;

    decode_media_id(raw)
}

#[utoipa::path(
    post,
    path = "/api/events",
    tag = "videos",
    request_body = VideoEventRequest,
    responses(
        (status = 200, description = "Event recorded", body = VideoEventResponse),
        (status = 400, description = "Unsupported event or malformed URL", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(media, event), fields(operation = "record_event"))]
pub async fn record_event(
    State(media): State<MediaState>,
    Json(event): Json<VideoEventRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if event.event_type != COPY_EVENT_TYPE {
        return Err(AppError::InvalidInput(format!(
            "Unsupported event type: {}",
            event.event_type
        ))
        .into());
    }

    let id = media_id_from_url(&event.video_url)?;
    let copy_count = media.store.record_copy(&id).await?;

    tracing::info!(media_id = %id, copy_count = copy_count, "Share link copied");

    Ok(Json(VideoEventResponse { id, copy_count }))
}
