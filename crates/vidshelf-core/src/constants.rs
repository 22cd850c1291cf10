//! Media delivery constants shared by the store and the HTTP layer.

/// Path prefix under which stored videos are publicly reachable.
pub const MEDIA_ROUTE_PREFIX: &str = "/v/";

/// Every stored resource is served as MP4.
pub const MEDIA_CONTENT_TYPE: &str = "video/mp4";

/// Stored resources never change once published, so they may be cached for a year.
pub const MEDIA_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub const ACCEPT_RANGES_BYTES: &str = "bytes";

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, HEAD, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Range";
pub const CORS_EXPOSE_HEADERS: &str = "Content-Length, Content-Range, Accept-Ranges";
pub const CORS_MAX_AGE_SECS: &str = "600";

/// Multipart field name the upload form uses for its files.
pub const UPLOAD_FIELD_NAME: &str = "uploads";

/// File extension accepted for uploads when the declared type is not `video/mp4`.
pub const UPLOAD_EXTENSION: &str = ".mp4";

/// Upper bound on files accepted in one upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// Event type the video list reports when a share link is copied.
pub const COPY_EVENT_TYPE: &str = "copied";
