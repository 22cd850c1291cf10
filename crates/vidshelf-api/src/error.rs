//! HTTP error response conversion
//!
//! `AppError` has two renderings. Management API handlers return
//! `Result<impl IntoResponse, HttpAppError>` and get the JSON [`ErrorResponse`] body.
//! Media handlers return [`MediaError`], which answers in plain text and always carries
//! the media CORS headers so players on other origins can read the status.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use vidshelf_core::{constants, AppError, ErrorMetadata, LogLevel};
use vidshelf_storage::StorageError;

use crate::handlers::media_stream::{
    insert_cors_headers, insert_delivery_headers, insert_media_headers,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(storage_error_to_app_error(err))
    }
}

pub(crate) fn storage_error_to_app_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(msg) => AppError::NotFound(format!("Video not found: {}", msg)),
        StorageError::InvalidKey(msg) => AppError::InvalidIdentifier(msg),
        StorageError::TooLarge { limit } => AppError::PayloadTooLarge(format!(
            "File exceeds the maximum size of {} MB",
            limit / 1024 / 1024
        )),
        StorageError::UploadFailed(msg)
        | StorageError::DownloadFailed(msg)
        | StorageError::DeleteFailed(msg) => AppError::Storage(msg),
        StorageError::Io(err) => AppError::InternalWithSource {
            message: "Media store I/O failure".to_string(),
            source: err.into(),
        },
        StorageError::ConfigError(msg) => AppError::Internal(msg),
    }
}

pub(crate) fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

fn status_of(error: &AppError) -> StatusCode {
    StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = status_of(app_error);

        log_error(app_error);

        // Details only outside production, and never for sensitive errors.
        let (details, error_type) = if is_production_env() || app_error.is_sensitive() {
            (None, None)
        } else {
            (
                Some(app_error.detailed_message()),
                Some(app_error.error_type().to_string()),
            )
        };

        let body = Json(ErrorResponse {
            error: app_error.client_message(),
            details,
            error_type,
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        });

        (status, body).into_response()
    }
}

/// Error rendering for the public media surface.
#[derive(Debug)]
pub struct MediaError(pub AppError);

impl From<AppError> for MediaError {
    fn from(err: AppError) -> Self {
        MediaError(err)
    }
}

impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = status_of(app_error);

        log_error(app_error);

        // Every media response, errors included, carries the CORS and delivery headers.
        let mut headers = HeaderMap::new();
        insert_cors_headers(&mut headers);
        insert_delivery_headers(&mut headers);

        let body = match app_error {
            AppError::RangeNotSatisfiable { total } => {
                insert_media_headers(&mut headers);
                if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", total)) {
                    headers.insert(header::CONTENT_RANGE, value);
                }
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
                String::new()
            }
            other => {
                if matches!(other, AppError::MethodNotAllowed(_)) {
                    headers.insert(
                        header::ALLOW,
                        HeaderValue::from_static(constants::CORS_ALLOW_METHODS),
                    );
                }
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                other.client_message()
            }
        };

        (status, headers, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_error_not_found() {
        let HttpAppError(app_err) = StorageError::NotFound("abc".to_string()).into();
        match app_err {
            AppError::NotFound(msg) => assert!(msg.contains("abc")),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_storage_error_invalid_key() {
        let HttpAppError(app_err) = StorageError::InvalidKey("bad".to_string()).into();
        assert!(matches!(app_err, AppError::InvalidIdentifier(_)));
        assert_eq!(app_err.http_status_code(), 400);
    }

    #[test]
    fn test_from_storage_error_too_large() {
        let HttpAppError(app_err) = StorageError::TooLarge {
            limit: 5 * 1024 * 1024,
        }
        .into();
        match app_err {
            AppError::PayloadTooLarge(msg) => assert!(msg.contains("5 MB")),
            _ => panic!("Expected PayloadTooLarge variant"),
        }
    }

    #[test]
    fn test_from_storage_error_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let HttpAppError(app_err) = StorageError::Io(io_err).into();
        assert_eq!(app_err.error_code(), "INTERNAL_ERROR");
        assert!(app_err.detailed_message().contains("Caused by: disk"));
    }

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse {
            error: "Not found".to_string(),
            details: None,
            error_type: None,
            code: "NOT_FOUND".to_string(),
            recoverable: false,
            suggested_action: None,
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json.get("code").and_then(|v| v.as_str()), Some("NOT_FOUND"));
        assert!(json.get("recoverable").and_then(|v| v.as_bool()).is_some());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_media_error_unsatisfiable_headers() {
        let response = MediaError(AppError::RangeNotSatisfiable { total: 1000 }).into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_RANGE], "bytes */1000");
        assert_eq!(headers[header::CONTENT_TYPE], constants::MEDIA_CONTENT_TYPE);
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_media_error_not_found_is_plain_text() {
        let response = MediaError(AppError::NotFound("x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::CACHE_CONTROL], constants::MEDIA_CACHE_CONTROL);
    }

    #[test]
    fn test_media_error_method_not_allowed_lists_methods() {
        let response = MediaError(AppError::MethodNotAllowed("POST".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD, OPTIONS");
    }
}
