//! Public media delivery with HTTP byte-range support.
//!
//! `/v/{id}` is intentionally unauthenticated: anyone holding a share URL can play
//! the video, and the 128-bit random token in every generated identifier is what keeps
//! URLs unguessable.

use crate::error::MediaError;
use crate::state::MediaState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use percent_encoding::percent_decode_str;
use vidshelf_core::constants::{
    ACCEPT_RANGES_BYTES, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_ALLOW_ORIGIN,
    CORS_EXPOSE_HEADERS, CORS_MAX_AGE_SECS, MEDIA_CACHE_CONTROL, MEDIA_CONTENT_TYPE,
    MEDIA_ROUTE_PREFIX,
};
use vidshelf_core::{resolve, AppError, ServingPlan};
use vidshelf_storage::{is_valid_media_id, StorageError};

/// Add the cross-origin headers every media response carries.
pub fn insert_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(CORS_EXPOSE_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(CORS_MAX_AGE_SECS),
    );
}

/// Add the caching and range headers carried by every media response.
pub fn insert_delivery_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(MEDIA_CACHE_CONTROL),
    );
    headers.insert(
        header::ACCEPT_RANGES,
        HeaderValue::from_static(ACCEPT_RANGES_BYTES),
    );
}

/// Add the delivery headers plus the content type of a stored video.
pub fn insert_media_headers(headers: &mut HeaderMap) {
    insert_delivery_headers(headers);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(MEDIA_CONTENT_TYPE),
    );
}

/// Percent-decode a raw path segment and check it names a single stored file.
pub fn decode_media_id(raw: &str) -> Result<String, AppError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| AppError::InvalidIdentifier(raw.to_string()))?;

    if !is_valid_media_id(&decoded) {
        return Err(AppError::InvalidIdentifier(decoded.into_owned()));
    }

    Ok(decoded.into_owned())
}

/// The still-encoded identifier segment of a media request path.
fn raw_media_segment(uri: &Uri) -> &str {
    uri.path()
        .strip_prefix(MEDIA_ROUTE_PREFIX)
        .unwrap_or_default()
}

/// Serving plan for the request's `Range` header against `total` bytes.
///
/// A header value that is not visible ASCII cannot match the range grammar.
fn plan_for(headers: &HeaderMap, total: u64) -> ServingPlan {
    match headers.get(header::RANGE) {
        None => resolve(None, total),
        Some(value) => match value.to_str() {
            Ok(value) => resolve(Some(value), total),
            Err(_) => ServingPlan::Unsatisfiable { total },
        },
    }
}

/// Any failure to find or open the file before streaming starts reads as absent.
fn lookup_error(id: &str, err: StorageError) -> MediaError {
    match err {
        StorageError::InvalidKey(msg) => MediaError(AppError::InvalidIdentifier(msg)),
        StorageError::NotFound(_) => MediaError(AppError::NotFound(format!("Video not found: {}", id))),
        other => {
            tracing::warn!(media_id = %id, error = %other, "Media lookup failed");
            MediaError(AppError::NotFound(format!("Video not found: {}", id)))
        }
    }
}

#[utoipa::path(
    get,
    path = "/v/{id}",
    tag = "media",
    params(
        ("id" = String, Path, description = "Video identifier as returned by the upload"),
        ("Range" = Option<String>, Header, description = "Single byte range, e.g. bytes=0-1023")
    ),
    responses(
        (status = 200, description = "Whole video", content_type = "video/mp4"),
        (status = 206, description = "Requested byte window", content_type = "video/mp4"),
        (status = 400, description = "Invalid identifier", content_type = "text/plain"),
        (status = 404, description = "Video not found", content_type = "text/plain"),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn serve_media(
    State(media): State<MediaState>,
    method: Method,
    uri: Uri,
    request_headers: HeaderMap,
) -> Result<Response, MediaError> {
    let started = std::time::Instant::now();
    let id = decode_media_id(raw_media_segment(&uri))?;

    let total = media
        .store
        .content_length(&id)
        .await
        .map_err(|e| lookup_error(&id, e))?;

    let plan = plan_for(&request_headers, total);
    let Some((start, len)) = plan.window() else {
        return Err(MediaError(AppError::RangeNotSatisfiable { total }));
    };

    let body = if method == Method::HEAD || len == 0 {
        Body::empty()
    } else {
        let stream = media
            .store
            .open_range(&id, start, len)
            .await
            .map_err(|e| lookup_error(&id, e))?;

        Body::from_stream(stream.map(|result| {
            result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
        }))
    };

    let status = StatusCode::from_u16(plan.status_code()).unwrap_or(StatusCode::OK);
    let mut response = Response::builder()
        .status(status)
        .header(header::CONTENT_LENGTH, plan.content_length())
        .body(body)
        .map_err(|e| MediaError(AppError::Internal(format!("Failed to build response: {}", e))))?;

    let headers = response.headers_mut();
    insert_media_headers(headers);
    insert_cors_headers(headers);
    if let Some(content_range) = plan.content_range() {
        if let Ok(value) = HeaderValue::from_str(&content_range) {
            headers.insert(header::CONTENT_RANGE, value);
        }
    }

    tracing::info!(
        media_id = %id,
        method = %method,
        status = status.as_u16(),
        bytes = len,
        total = total,
        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Serving media"
    );

    Ok(response)
}

/// CORS preflight for media URLs. Never touches the store.
pub async fn preflight() -> Response {
    let mut headers = HeaderMap::new();
    insert_cors_headers(&mut headers);
    insert_delivery_headers(&mut headers);
    (StatusCode::NO_CONTENT, headers).into_response()
}

pub async fn method_not_allowed(method: Method) -> MediaError {
    MediaError(AppError::MethodNotAllowed(method.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_media_id_accepts_plain_and_encoded() {
        assert_eq!(decode_media_id("abc").unwrap(), "abc");
        assert_eq!(decode_media_id("my%20clip.mp4").unwrap(), "my clip.mp4");
    }

    #[test]
    fn test_decode_media_id_rejects_traversal() {
        for raw in ["", "..", "%2E%2E", "..%2Fsecret", "a%2Fb", "a%5Cb", "a%5C..%5Cb"] {
            let err = decode_media_id(raw).unwrap_err();
            assert!(matches!(err, AppError::InvalidIdentifier(_)), "{raw:?}");
        }
    }

    #[test]
    fn test_decode_media_id_rejects_invalid_utf8() {
        assert!(matches!(
            decode_media_id("%FF%FE"),
            Err(AppError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_raw_media_segment_keeps_encoding() {
        let uri: Uri = "/v/a%2Fb?x=1".parse().unwrap();
        assert_eq!(raw_media_segment(&uri), "a%2Fb");
    }

    #[test]
    fn test_non_ascii_range_header_is_unsatisfiable() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::RANGE,
            HeaderValue::from_bytes(b"bytes=0-\xff").unwrap(),
        );
        assert_eq!(plan_for(&headers, 10), ServingPlan::Unsatisfiable { total: 10 });
        assert_eq!(plan_for(&HeaderMap::new(), 10), ServingPlan::Full { total: 10 });
    }
}
