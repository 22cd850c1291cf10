use crate::error::{ErrorResponse, HttpAppError};
use crate::state::MediaState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use utoipa::ToSchema;
use vidshelf_core::AppError;
use vidshelf_storage::{is_valid_media_id, original_name_from_id, StoredMedia};

const DEFAULT_PAGE: usize = 1;
const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// Raw query parameters; values that do not parse fall back to the defaults.
#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ListQuery {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size, 1 to 100 (default 10)
    pub limit: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PAGE)
            .max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub copy_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub has_next: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoListResponse {
    pub videos: Vec<VideoEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}

/// `DELETE /api/videos?id=`, the form the video list sends.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct DeleteQuery {
    /// Video identifier
    pub id: Option<String>,
}

/// Newest first; identifiers break ties so pages are stable.
fn sort_newest_first(media: &mut [StoredMedia]) {
    media.sort_by(|a, b| {
        Reverse(a.modified_at)
            .cmp(&Reverse(b.modified_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[utoipa::path(
    get,
    path = "/api/videos",
    tag = "videos",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of stored videos", body = VideoListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(media, params), fields(operation = "list_videos"))]
pub async fn list_videos(
    Query(params): Query<ListQuery>,
    State(media): State<MediaState>,
) -> Result<impl IntoResponse, HttpAppError> {
    let page = params.page();
    let limit = params.limit();

    let mut all = media.store.list().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list videos");
        HttpAppError::from(e)
    })?;
    sort_newest_first(&mut all);

    let total = all.len();
    let offset = (page - 1).saturating_mul(limit);

    let videos = all
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|m| VideoEntry {
            url: media.public_url(&m.id),
            original_name: original_name_from_id(&m.id).to_string(),
            filename: m.id.clone(),
            id: m.id,
            size: m.size,
            created_at: m.modified_at,
            copy_count: m.copy_count,
        })
        .collect();

    Ok(Json(VideoListResponse {
        videos,
        pagination: Pagination {
            page,
            limit,
            total,
            has_next: offset.saturating_add(limit) < total,
        },
    }))
}

#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    tag = "videos",
    params(
        ("id" = String, Path, description = "Video identifier")
    ),
    responses(
        (status = 200, description = "Video deleted", body = DeleteResponse),
        (status = 400, description = "Invalid identifier", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(media), fields(operation = "delete_video"))]
pub async fn delete_video(
    Path(id): Path<String>,
    State(media): State<MediaState>,
) -> Result<impl IntoResponse, HttpAppError> {
    remove_video(&media, id).await
}

#[utoipa::path(
    delete,
    path = "/api/videos",
    tag = "videos",
    params(DeleteQuery),
    responses(
        (status = 200, description = "Video deleted", body = DeleteResponse),
        (status = 400, description = "Missing or invalid identifier", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(media, params), fields(operation = "delete_video"))]
pub async fn delete_video_by_query(
    Query(params): Query<DeleteQuery>,
    State(media): State<MediaState>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = params
        .id
        .ok_or_else(|| AppError::InvalidInput("Missing video id".to_string()))?;

    remove_video(&media, id).await
}

async fn remove_video(media: &MediaState, id: String) -> Result<Json<DeleteResponse>, HttpAppError> {
    if !is_valid_media_id(&id) {
        return Err(AppError::InvalidIdentifier(id).into());
    }

    media.store.delete(&id).await?;

    tracing::info!(media_id = %id, "Video deleted");

    Ok(Json(DeleteResponse {
        message: "Video deleted".to_string(),
    }))
}
