use crate::error::{ErrorResponse, HttpAppError};
use crate::state::MediaState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;
use vidshelf_core::constants::{
    MAX_FILES_PER_UPLOAD, MEDIA_CONTENT_TYPE, UPLOAD_EXTENSION, UPLOAD_FIELD_NAME,
};
use vidshelf_core::AppError;
use vidshelf_storage::{generate_media_id, StorageError};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    /// Identifier of the stored video, also its file name in the store
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub copy_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<UploadedVideo>,
}

/// A part is accepted when it declares `video/mp4` or its file name ends in `.mp4`.
pub fn is_mp4_upload(content_type: Option<&str>, file_name: &str) -> bool {
    let declared_mp4 = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().eq_ignore_ascii_case(MEDIA_CONTENT_TYPE))
        .unwrap_or(false);

    declared_mp4 || file_name.to_ascii_lowercase().ends_with(UPLOAD_EXTENSION)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
    }
}

/// Remove everything this request already published; the request is all-or-nothing.
async fn discard_stored(media: &MediaState, stored: &[UploadedVideo]) {
    for video in stored {
        if let Err(e) = media.store.delete(&video.filename).await {
            tracing::warn!(
                media_id = %video.filename,
                error = %e,
                "Failed to remove video from rejected upload"
            );
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "videos",
    request_body(content_type = "multipart/form-data", description = "One or more MP4 files in parts named `uploads`"),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "No files, or a file is not MP4", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn upload_videos(
    State(media): State<MediaState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut stored: Vec<UploadedVideo> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard_stored(&media, &stored).await;
                return Err(multipart_error(e).into());
            }
        };

        if field.name() != Some(UPLOAD_FIELD_NAME) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("unnamed").to_string();
        if !is_mp4_upload(field.content_type(), &original_name) {
            discard_stored(&media, &stored).await;
            return Err(AppError::InvalidInput(format!(
                "{} is not an MP4 file.",
                original_name
            ))
            .into());
        }

        if stored.len() >= MAX_FILES_PER_UPLOAD {
            discard_stored(&media, &stored).await;
            return Err(AppError::InvalidInput(format!(
                "At most {} files can be uploaded at once.",
                MAX_FILES_PER_UPLOAD
            ))
            .into());
        }

        let id = generate_media_id(&original_name);
        let reader = StreamReader::new(field.map_err(|e| std::io::Error::other(e.body_text())));

        let written = match media
            .store
            .put_stream(&id, Box::pin(reader), media.max_upload_bytes)
            .await
        {
            Ok(written) => written,
            Err(StorageError::TooLarge { limit }) => {
                discard_stored(&media, &stored).await;
                return Err(AppError::PayloadTooLarge(format!(
                    "{} exceeds the maximum size of {} MB.",
                    original_name,
                    limit / 1024 / 1024
                ))
                .into());
            }
            Err(e) => {
                discard_stored(&media, &stored).await;
                tracing::error!(error = %e, original_name = %original_name, "Failed to store upload");
                return Err(e.into());
            }
        };

        tracing::info!(
            media_id = %id,
            original_name = %original_name,
            bytes = written,
            "Video uploaded"
        );

        stored.push(UploadedVideo {
            url: media.public_url(&id),
            filename: id,
            original_name,
            // Fresh identifier: never copied yet.
            copy_count: 0,
        });
    }

    if stored.is_empty() {
        return Err(AppError::InvalidInput("No files uploaded.".to_string()).into());
    }

    Ok(Json(UploadResponse {
        message: "File uploaded successfully!".to_string(),
        files: stored,
    }))
}
